//! Per-generation novelty evaluation.

use std::path::PathBuf;

use super::{NoveltyArchive, NoveltyError, NoveltyScorer, RenderDispatcher, SnapshotSampler};
use crate::compute::{ImageShape, Phenotype, RendererSet};
use crate::schema::NoveltyConfig;

/// Outcome of evaluating one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Fitness per genome, aligned with the input batch.
    pub fitness: Vec<f32>,
    /// Indices of genomes admitted to the archive.
    pub admitted: Vec<usize>,
    /// Snapshot files written for the admitted genomes, in `admitted` order.
    pub snapshots: Vec<PathBuf>,
    /// Archive size after the batch.
    pub archive_size: usize,
}

impl EvaluationReport {
    /// Index and fitness of the most novel genome. Earliest index wins ties.
    pub fn best(&self) -> Option<(usize, f32)> {
        self.fitness
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, f)| match best {
                Some((_, b)) if b >= f => best,
                _ => Some((i, f)),
            })
    }
}

/// Novelty evaluator called once per generation by a population driver.
pub struct NoveltyEvaluator<G> {
    config: NoveltyConfig,
    dispatcher: RenderDispatcher<G>,
    scorer: NoveltyScorer,
    archive: NoveltyArchive,
    sampler: SnapshotSampler,
}

impl<G: Sync> NoveltyEvaluator<G> {
    /// Create an evaluator, resolving the renderer for the configured scheme.
    pub fn new(config: NoveltyConfig, renderers: &RendererSet<G>) -> Result<Self, NoveltyError> {
        config.validate()?;

        let dispatcher = RenderDispatcher::new(config.workers, config.scheme, renderers)?;
        let shape = ImageShape::new(config.width, config.height, config.channels());
        let scorer = NoveltyScorer::new(shape);

        let mut archive = NoveltyArchive::new(shape);
        if let Some(max) = config.max_archive_size {
            // Offset so eviction draws differ from admission draws.
            let seed = config.random_seed.map(|seed| seed.wrapping_add(2));
            archive = archive.with_max_size(max, seed);
        }

        let sampler = SnapshotSampler::new(
            &config.output_dir,
            config.scheme,
            config.admission_probability,
            config.random_seed,
        )?;

        log::info!(
            "Novelty evaluator: {}x{} {} renders, {} workers, snapshots in {:?}",
            config.width,
            config.height,
            config.scheme,
            dispatcher.workers(),
            sampler.output_dir()
        );

        Ok(Self {
            config,
            dispatcher,
            scorer,
            archive,
            sampler,
        })
    }

    /// Resume from a previously saved archive.
    pub fn with_archive(mut self, archive: NoveltyArchive) -> Result<Self, NoveltyError> {
        if archive.shape() != self.archive.shape() {
            return Err(NoveltyError::ArchiveShape {
                expected: self.archive.shape(),
                found: archive.shape(),
            });
        }
        self.archive = archive;
        Ok(self)
    }

    pub fn config(&self) -> &NoveltyConfig {
        &self.config
    }

    pub fn archive(&self) -> &NoveltyArchive {
        &self.archive
    }

    /// Fitness every genome receives against an empty archive.
    pub fn fitness_ceiling(&self) -> f32 {
        self.scorer.ceiling()
    }

    /// Index the next admitted snapshot will be written under.
    pub fn output_index(&self) -> u64 {
        self.sampler.output_index()
    }

    /// Highest generation with a winner snapshot in the output directory.
    pub fn last_winner_generation(&self) -> usize {
        self.sampler.last_winner_generation()
    }

    /// Render a genome at evaluation resolution and normalize it.
    pub fn phenotype(&self, genome: &G) -> Result<Phenotype, NoveltyError> {
        let image = self
            .dispatcher
            .render_one(genome, self.config.width, self.config.height)?;
        Ok(image.clip().normalize())
    }

    /// Score a batch, admit a random sample of it, and grow the archive.
    ///
    /// Every genome is scored against the archive as it stood when the call
    /// began; entries admitted here only affect later batches. Any render or
    /// snapshot failure aborts the batch before the archive changes.
    pub fn evaluate(&mut self, genomes: &[G]) -> Result<EvaluationReport, NoveltyError> {
        let images = self
            .dispatcher
            .dispatch(genomes, self.config.width, self.config.height)?;
        let phenotypes: Vec<Phenotype> = images.iter().map(|i| i.clip().normalize()).collect();

        let fitness = {
            let snapshot = self.archive.snapshot();
            let scorer = &self.scorer;
            self.dispatcher
                .install(|| scorer.score(&phenotypes, snapshot))
        };

        let admitted = self.sampler.draw_admissions(genomes.len());
        let full_scale = self.dispatcher.dispatch_subset(
            genomes,
            &admitted,
            self.config.full_width(),
            self.config.full_height(),
        )?;

        let mut staged = Vec::with_capacity(admitted.len());
        let mut snapshots = Vec::with_capacity(admitted.len());
        for (&index, image) in admitted.iter().zip(&full_scale) {
            snapshots.push(self.sampler.persist(image)?);
            staged.push(phenotypes[index].clone());
            log::debug!("Admitted genome {} with fitness {:.4}", index, fitness[index]);
        }

        self.archive.extend(staged)?;
        log::info!("{} archive entries", self.archive.len());

        Ok(EvaluationReport {
            fitness,
            admitted,
            snapshots,
            archive_size: self.archive.len(),
        })
    }

    /// Persist a generation winner at full scale and archive its phenotype.
    ///
    /// Runs independently of the stochastic admission in [`Self::evaluate`],
    /// so a winner that was also sampled ends up in the archive twice.
    pub fn record_winner(
        &mut self,
        winner: &G,
        generation: usize,
    ) -> Result<PathBuf, NoveltyError> {
        let full = self.dispatcher.render_one(
            winner,
            self.config.full_width(),
            self.config.full_height(),
        )?;
        let path = self.sampler.persist_winner(&full, generation)?;

        let phenotype = self.phenotype(winner)?;
        self.archive.push(phenotype)?;
        log::info!(
            "Generation {} winner saved to {:?}, {} archive entries",
            generation,
            path,
            self.archive.len()
        );

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{RenderError, RenderedImage};
    use crate::schema::Scheme;
    use tempfile::{TempDir, tempdir};

    /// Genomes are intensities; each renders as a flat image of that value.
    fn flat_renderers() -> RendererSet<f32> {
        RendererSet::new().with(Scheme::Gray, |g: &f32, w: usize, h: usize| {
            if g.is_nan() {
                return Err(RenderError::Failed("NaN genome".to_string()));
            }
            Ok(RenderedImage::filled(ImageShape::new(w, h, 1), *g))
        })
    }

    fn config(output_dir: &std::path::Path, admission_probability: f64) -> NoveltyConfig {
        NoveltyConfig {
            width: 4,
            height: 4,
            full_scale: 2,
            workers: 2,
            scheme: Scheme::Gray,
            admission_probability,
            output_dir: output_dir.to_path_buf(),
            random_seed: Some(9),
            max_archive_size: None,
        }
    }

    fn evaluator(admission_probability: f64) -> (NoveltyEvaluator<f32>, TempDir) {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), admission_probability);
        (NoveltyEvaluator::new(config, &flat_renderers()).unwrap(), dir)
    }

    #[test]
    fn test_empty_archive_scenario() {
        let (mut evaluator, _dir) = evaluator(0.0);
        assert_eq!(evaluator.fitness_ceiling(), 4.0);

        let first = evaluator.evaluate(&[0.0]).unwrap();
        assert_eq!(first.fitness, vec![4.0]);
        assert!(first.admitted.is_empty());

        let second = evaluator.evaluate(&[0.0]).unwrap();
        assert_eq!(second.fitness, first.fitness);
        assert_eq!(second.archive_size, 0);

        let black = evaluator.phenotype(&0.0).unwrap();
        evaluator.archive.push(black).unwrap();
        let third = evaluator.evaluate(&[0.0, 255.0]).unwrap();
        assert_eq!(third.fitness, vec![0.0, 4.0]);
    }

    #[test]
    fn test_admissions_invisible_to_same_batch() {
        let (mut evaluator, dir) = evaluator(1.0);

        let report = evaluator.evaluate(&[0.0, 0.0, 255.0]).unwrap();
        // Identical genomes would score 0.0 against each other if admissions
        // leaked into the batch.
        assert_eq!(report.fitness, vec![4.0, 4.0, 4.0]);
        assert_eq!(report.admitted, vec![0, 1, 2]);
        assert_eq!(report.archive_size, 3);
        assert_eq!(
            report.snapshots,
            vec![
                dir.path().join("novelty-000001.png"),
                dir.path().join("novelty-000002.png"),
                dir.path().join("novelty-000003.png"),
            ]
        );
        assert_eq!(evaluator.output_index(), 4);

        let decoded = image::open(&report.snapshots[2]).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (8, 8));

        let next = evaluator.evaluate(&[0.0]).unwrap();
        assert_eq!(next.fitness, vec![0.0]);
        assert_eq!(next.snapshots[0], dir.path().join("novelty-000004.png"));
        assert_eq!(next.archive_size, 4);
    }

    #[test]
    fn test_fitness_follows_genome_order() {
        let (mut evaluator, _dir) = evaluator(0.0);
        let black = evaluator.phenotype(&0.0).unwrap();
        evaluator.archive.push(black).unwrap();

        let forward = evaluator.evaluate(&[0.0, 51.0, 255.0]).unwrap();
        let backward = evaluator.evaluate(&[255.0, 51.0, 0.0]).unwrap();

        let mut reversed = backward.fitness.clone();
        reversed.reverse();
        assert_eq!(forward.fitness, reversed);
        assert_eq!(forward.fitness[0], 0.0);
        assert_eq!(forward.fitness[2], 4.0);
    }

    #[test]
    fn test_render_failure_leaves_archive_untouched() {
        let (mut evaluator, _dir) = evaluator(1.0);
        let result = evaluator.evaluate(&[0.0, f32::NAN]);
        assert!(matches!(result, Err(NoveltyError::Render(_))));
        assert!(evaluator.archive().is_empty());
        assert_eq!(evaluator.output_index(), 1);
    }

    #[test]
    fn test_record_winner() {
        let (mut evaluator, dir) = evaluator(0.0);

        let path = evaluator.record_winner(&255.0, 7).unwrap();
        assert_eq!(path, dir.path().join("winning-novelty-000007.png"));
        assert_eq!(evaluator.archive().len(), 1);
        assert_eq!(evaluator.output_index(), 1);

        let report = evaluator.evaluate(&[255.0, 0.0]).unwrap();
        assert_eq!(report.fitness, vec![0.0, 4.0]);
    }

    #[test]
    fn test_archive_never_shrinks() {
        let (mut evaluator, _dir) = evaluator(0.5);
        let genomes: Vec<f32> = (0..10).map(|i| i as f32 * 25.0).collect();

        let mut last = 0;
        for generation in 0..5 {
            let report = evaluator.evaluate(&genomes).unwrap();
            assert!(report.archive_size >= last);
            assert!(report.archive_size <= last + genomes.len());
            assert_eq!(report.archive_size - last, report.admitted.len());
            last = report.archive_size;

            evaluator.record_winner(&genomes[0], generation).unwrap();
            assert_eq!(evaluator.archive().len(), last + 1);
            last += 1;
        }
    }

    #[test]
    fn test_with_archive_checks_shape() {
        let (evaluator, _dir) = evaluator(0.0);
        let other = NoveltyArchive::new(ImageShape::new(8, 8, 1));
        assert!(matches!(
            evaluator.with_archive(other),
            Err(NoveltyError::ArchiveShape { .. })
        ));
    }

    #[test]
    fn test_report_best() {
        let report = EvaluationReport {
            fitness: vec![1.0, 3.0, 3.0, 2.0],
            admitted: Vec::new(),
            snapshots: Vec::new(),
            archive_size: 0,
        };
        assert_eq!(report.best(), Some((1, 3.0)));
    }

    #[test]
    fn test_snapshot_failure_leaves_archive_untouched() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let mut evaluator =
            NoveltyEvaluator::new(config(&out, 1.0), &flat_renderers()).unwrap();

        std::fs::remove_dir(&out).unwrap();
        std::fs::write(&out, b"not a directory").unwrap();

        let result = evaluator.evaluate(&[0.0, 255.0]);
        assert!(matches!(result, Err(NoveltyError::Persist { .. })));
        assert!(evaluator.archive().is_empty());
    }

    #[test]
    fn test_resumed_evaluator_keeps_earlier_snapshots() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("archive.json");

        let mut first = NoveltyEvaluator::new(config(dir.path(), 1.0), &flat_renderers()).unwrap();
        let report = first.evaluate(&[0.0]).unwrap();
        first.record_winner(&0.0, 1).unwrap();
        first.archive().save_json(&archive_path).unwrap();
        drop(first);

        let archive = NoveltyArchive::load_json(&archive_path).unwrap();
        let mut resumed = NoveltyEvaluator::new(config(dir.path(), 1.0), &flat_renderers())
            .unwrap()
            .with_archive(archive)
            .unwrap();
        assert_eq!(resumed.output_index(), 2);
        assert_eq!(resumed.last_winner_generation(), 1);

        let next = resumed.evaluate(&[255.0]).unwrap();
        assert_ne!(next.snapshots, report.snapshots);
        assert_eq!(next.snapshots, vec![dir.path().join("novelty-000002.png")]);
        assert_eq!(next.archive_size, 3);

        let kept = image::open(&report.snapshots[0]).unwrap().to_luma8();
        assert!(kept.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_capped_archive_eviction_seed() {
        let dir = tempdir().unwrap();
        let mut capped = config(dir.path(), 1.0);
        capped.max_archive_size = Some(2);
        let mut evaluator = NoveltyEvaluator::new(capped, &flat_renderers()).unwrap();

        let genomes: Vec<f32> = (0..8).map(|i| i as f32 * 30.0).collect();
        let report = evaluator.evaluate(&genomes).unwrap();
        assert_eq!(report.archive_size, 2);
        assert_eq!(evaluator.archive().seen(), 8);

        let mut expected =
            NoveltyArchive::new(ImageShape::new(4, 4, 1)).with_max_size(2, Some(11));
        let phenotypes = genomes
            .iter()
            .map(|g| evaluator.phenotype(g).unwrap())
            .collect();
        expected.extend(phenotypes).unwrap();
        assert_eq!(evaluator.archive().snapshot(), expected.snapshot());
    }
}
