//! Generational driver that evolves pattern genomes under novelty fitness.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::compute::PatternRenderer;
use crate::compute::novelty::{NoveltyArchive, NoveltyError, NoveltyEvaluator};
use crate::schema::{GenomeBounds, PatternGenome, RunConfig};

use super::genome::GenomeRng;

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: PatternGenome,
    /// Novelty fitness from the last evaluation.
    pub fitness: f32,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

/// Per-generation progress passed to callbacks.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Generation just evaluated, counting generations of earlier runs in
    /// the same output directory.
    pub generation: usize,
    /// Best fitness in this generation.
    pub best_fitness: f32,
    /// Mean fitness in this generation.
    pub avg_fitness: f32,
    /// Genomes admitted by stochastic sampling this generation.
    pub admitted: usize,
    /// Archive size after the winner was recorded.
    pub archive_size: usize,
    /// Snapshot of the generation winner.
    pub winner_path: PathBuf,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxGenerations,
    FitnessThreshold,
    Cancelled,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Generations evaluated by this run.
    pub generations: usize,
    pub stop_reason: StopReason,
    /// Highest-fitness candidate observed over the run.
    pub best: Option<Candidate>,
    pub archive_size: usize,
    pub elapsed_seconds: f64,
}

/// Population loop feeding a `NoveltyEvaluator` once per generation.
pub struct NoveltyRun {
    config: RunConfig,
    bounds: GenomeBounds,
    rng: GenomeRng,
    evaluator: NoveltyEvaluator<PatternGenome>,
    population: Vec<Candidate>,
    best: Option<Candidate>,
    /// Last generation recorded before this run started.
    start_generation: usize,
    generation: usize,
    next_id: u64,
    checkpoint: Option<PathBuf>,
    cancelled: Arc<AtomicBool>,
}

impl NoveltyRun {
    /// Create a run with the built-in pattern renderer.
    pub fn new(config: RunConfig) -> Result<Self, NoveltyError> {
        config.validate()?;

        let evaluator =
            NoveltyEvaluator::new(config.novelty.clone(), &PatternRenderer::renderer_set())?;
        // Offset so population draws differ from admission draws.
        let rng = match config.novelty.random_seed {
            Some(seed) => GenomeRng::new(seed.wrapping_add(1)),
            None => GenomeRng::random(),
        };

        // Winner files are numbered by generation; keep counting from them.
        let start_generation = evaluator.last_winner_generation();

        Ok(Self {
            config,
            bounds: GenomeBounds::default(),
            rng,
            evaluator,
            population: Vec::new(),
            best: None,
            start_generation,
            generation: start_generation,
            next_id: 0,
            checkpoint: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Continue from a previously saved archive.
    pub fn with_archive(mut self, archive: NoveltyArchive) -> Result<Self, NoveltyError> {
        self.evaluator = self.evaluator.with_archive(archive)?;
        Ok(self)
    }

    /// Save the archive to `path` every `checkpoint_interval` generations,
    /// when the run stops, and when a generation fails.
    pub fn with_checkpoint<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.checkpoint = Some(path.as_ref().to_path_buf());
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn evaluator(&self) -> &NoveltyEvaluator<PatternGenome> {
        &self.evaluator
    }

    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Initialize the population.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.generation = self.start_generation;

        let channels = self.config.novelty.channels();
        for _ in 0..self.config.population.size {
            let genome = self.rng.random_genome(
                channels,
                self.config.population.waves_per_channel,
                &self.bounds,
            );
            let id = self.take_id();
            self.population.push(Candidate {
                id,
                genome,
                fitness: 0.0,
                generation: 0,
                parents: Vec::new(),
            });
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Evaluate the current population and record its winner.
    pub fn evaluate_generation(&mut self) -> Result<RunProgress, NoveltyError> {
        let genomes: Vec<PatternGenome> =
            self.population.iter().map(|c| c.genome.clone()).collect();
        let report = self.evaluator.evaluate(&genomes)?;

        for (candidate, fitness) in self.population.iter_mut().zip(&report.fitness) {
            candidate.fitness = *fitness;
        }

        self.generation += 1;
        let (winner_idx, best_fitness) = report.best().unwrap_or((0, 0.0));
        let winner_path = self
            .evaluator
            .record_winner(&self.population[winner_idx].genome, self.generation)?;

        if self
            .best
            .as_ref()
            .is_none_or(|best| best_fitness > best.fitness)
        {
            self.best = Some(self.population[winner_idx].clone());
        }

        let avg_fitness =
            report.fitness.iter().sum::<f32>() / report.fitness.len().max(1) as f32;

        Ok(RunProgress {
            generation: self.generation,
            best_fitness,
            avg_fitness,
            admitted: report.admitted.len(),
            archive_size: self.evaluator.archive().len(),
            winner_path,
        })
    }

    /// Replace the population with offspring of the evaluated one.
    pub fn breed(&mut self) {
        let pop = self.config.population.clone();
        self.population
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let mut next_gen = Vec::with_capacity(pop.size);

        // Elitism: keep best individuals
        for elite in self.population.iter().take(pop.elitism.min(pop.size)) {
            let mut elite = elite.clone();
            elite.generation = self.generation;
            next_gen.push(elite);
        }

        while next_gen.len() < pop.size {
            let idx1 = self.select_index(pop.tournament_size);
            let idx2 = self.select_index(pop.tournament_size);
            let parent1 = &self.population[idx1];
            let parent2 = &self.population[idx2];

            let mut genome = if self.rng.unit() < pop.crossover_rate {
                self.rng.crossover(&parent1.genome, &parent2.genome)
            } else {
                parent1.genome.clone()
            };
            self.rng
                .mutate(&mut genome, pop.mutation_rate, pop.mutation_strength, &self.bounds);

            let parents = vec![parent1.id, parent2.id];
            let id = self.take_id();
            next_gen.push(Candidate {
                id,
                genome,
                fitness: 0.0,
                generation: self.generation,
                parents,
            });
        }

        self.population = next_gen;
    }

    /// Generations evaluated since the run started.
    fn generations_run(&self) -> usize {
        self.generation - self.start_generation
    }

    fn save_checkpoint(&self) -> Result<(), NoveltyError> {
        if let Some(path) = &self.checkpoint {
            self.evaluator.archive().save_json(path)?;
            log::debug!(
                "Checkpointed {} archive entries to {:?}",
                self.evaluator.archive().len(),
                path
            );
        }
        Ok(())
    }

    /// Tournament selection over the current population.
    fn select_index(&mut self, size: usize) -> usize {
        let mut best_idx = 0;
        let mut best_fitness = f32::NEG_INFINITY;
        for _ in 0..size.max(1) {
            let idx = self.rng.index(self.population.len());
            if self.population[idx].fitness > best_fitness {
                best_fitness = self.population[idx].fitness;
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Run with progress callback until a stop condition is met.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunResult, NoveltyError>
    where
        F: FnMut(&RunProgress),
    {
        let start_time = std::time::Instant::now();
        self.initialize();

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }

            let progress = match self.evaluate_generation() {
                Ok(progress) => progress,
                Err(e) => {
                    if let Err(save_error) = self.save_checkpoint() {
                        log::error!("Failed to checkpoint archive: {}", save_error);
                    }
                    return Err(e);
                }
            };

            let interval = self.config.checkpoint_interval;
            if interval > 0 && self.generations_run() % interval == 0 {
                self.save_checkpoint()?;
            }
            callback(&progress);

            if progress.best_fitness >= self.config.population.max_fitness_threshold {
                break StopReason::FitnessThreshold;
            }
            if self
                .config
                .generations
                .is_some_and(|max| self.generations_run() >= max)
            {
                break StopReason::MaxGenerations;
            }

            self.breed();
        };

        self.save_checkpoint()?;

        Ok(RunResult {
            generations: self.generations_run(),
            stop_reason,
            best: self.best.clone(),
            archive_size: self.evaluator.archive().len(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Run (blocking).
    pub fn run(&mut self) -> Result<RunResult, NoveltyError> {
        self.run_with_callback(|_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NoveltyConfig, PopulationConfig, Scheme};
    use tempfile::tempdir;

    fn small_config(dir: &std::path::Path, scheme: Scheme) -> RunConfig {
        RunConfig {
            novelty: NoveltyConfig {
                width: 8,
                height: 8,
                full_scale: 2,
                workers: 2,
                scheme,
                admission_probability: 0.2,
                output_dir: dir.to_path_buf(),
                random_seed: Some(3),
                max_archive_size: None,
            },
            population: PopulationConfig {
                size: 6,
                ..Default::default()
            },
            generations: Some(3),
            checkpoint_interval: 1,
        }
    }

    #[test]
    fn test_initialize() {
        let dir = tempdir().unwrap();
        let mut run = NoveltyRun::new(small_config(dir.path(), Scheme::Color)).unwrap();
        run.initialize();

        assert_eq!(run.population().len(), 6);
        assert!(run.population().iter().all(|c| c.genome.channels.len() == 3));
    }

    #[test]
    fn test_first_generation_scores_ceiling() {
        let dir = tempdir().unwrap();
        let mut run = NoveltyRun::new(small_config(dir.path(), Scheme::Gray)).unwrap();
        run.initialize();

        let progress = run.evaluate_generation().unwrap();
        assert_eq!(progress.best_fitness, 8.0);
        assert!(run.population().iter().all(|c| c.fitness == 8.0));
        assert_eq!(progress.archive_size, progress.admitted + 1);
        assert_eq!(
            progress.winner_path,
            dir.path().join("winning-novelty-000001.png")
        );
    }

    #[test]
    fn test_run_stops_after_generations() {
        let dir = tempdir().unwrap();
        let mut run = NoveltyRun::new(small_config(dir.path(), Scheme::Mono)).unwrap();

        let mut seen = Vec::new();
        let result = run
            .run_with_callback(|progress| seen.push(progress.archive_size))
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.generations, 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(result.best.is_some());
        assert!(dir.path().join("winning-novelty-000003.png").exists());
    }

    #[test]
    fn test_fitness_threshold_stops_run() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path(), Scheme::Gray);
        config.population.max_fitness_threshold = 1.0;
        config.generations = None;

        let result = NoveltyRun::new(config).unwrap().run().unwrap();
        assert_eq!(result.stop_reason, StopReason::FitnessThreshold);
        assert_eq!(result.generations, 1);
    }

    #[test]
    fn test_cancellation() {
        let dir = tempdir().unwrap();
        let mut run = NoveltyRun::new(small_config(dir.path(), Scheme::Gray)).unwrap();
        run.cancel_handle().store(true, Ordering::Relaxed);

        let result = run.run().unwrap();
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.generations, 0);
        assert_eq!(result.archive_size, 0);
    }

    #[test]
    fn test_breed_keeps_population_size() {
        let dir = tempdir().unwrap();
        let mut run = NoveltyRun::new(small_config(dir.path(), Scheme::Gray)).unwrap();
        run.initialize();
        run.evaluate_generation().unwrap();
        run.breed();

        assert_eq!(run.population().len(), 6);
        let offspring = run.population().iter().filter(|c| !c.parents.is_empty());
        assert_eq!(offspring.count(), 4);
    }

    #[test]
    fn test_resumed_run_continues_generation_numbering() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path(), Scheme::Gray);
        config.generations = Some(2);
        NoveltyRun::new(config.clone()).unwrap().run().unwrap();
        let first_winner = std::fs::read(dir.path().join("winning-novelty-000001.png")).unwrap();

        config.generations = Some(1);
        let mut resumed = NoveltyRun::new(config).unwrap();
        let mut generations = Vec::new();
        let result = resumed
            .run_with_callback(|progress| generations.push(progress.generation))
            .unwrap();

        assert_eq!(result.generations, 1);
        assert_eq!(generations, vec![3]);
        assert!(dir.path().join("winning-novelty-000003.png").exists());
        assert_eq!(
            std::fs::read(dir.path().join("winning-novelty-000001.png")).unwrap(),
            first_winner
        );
    }

    #[test]
    fn test_checkpoint_interval() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("archive.json");
        let mut config = small_config(dir.path(), Scheme::Gray);
        config.generations = Some(3);
        config.checkpoint_interval = 2;

        let mut run = NoveltyRun::new(config).unwrap().with_checkpoint(&archive_path);
        let mut saved = Vec::new();
        let result = run
            .run_with_callback(|_| saved.push(archive_path.exists()))
            .unwrap();

        assert_eq!(saved, vec![false, true, true]);
        let archive = NoveltyArchive::load_json(&archive_path).unwrap();
        assert_eq!(archive.len(), result.archive_size);
    }

    #[test]
    fn test_cancelled_run_saves_checkpoint() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("archive.json");
        let mut config = small_config(dir.path(), Scheme::Mono);
        config.generations = None;
        config.checkpoint_interval = 0;

        let mut run = NoveltyRun::new(config).unwrap().with_checkpoint(&archive_path);
        let cancel = run.cancel_handle();
        let result = run
            .run_with_callback(|progress| {
                assert!(!archive_path.exists());
                if progress.generation == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.generations, 2);
        let archive = NoveltyArchive::load_json(&archive_path).unwrap();
        assert_eq!(archive.len(), result.archive_size);
    }
}
