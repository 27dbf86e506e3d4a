//! Nearest-neighbor novelty scoring.

use rayon::prelude::*;

use crate::compute::{ImageShape, Phenotype};

/// Scores phenotypes by their distance to the closest archive entry.
#[derive(Debug, Clone, Copy)]
pub struct NoveltyScorer {
    ceiling: f32,
}

impl NoveltyScorer {
    /// Scorer for phenotypes of `shape`.
    ///
    /// The ceiling is the distance between an all-zero and an all-one image,
    /// `sqrt(width * height * channels)`.
    pub fn new(shape: ImageShape) -> Self {
        Self {
            ceiling: (shape.len() as f32).sqrt(),
        }
    }

    /// Fitness given when the archive is empty.
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Novelty of a single phenotype against `archive`.
    pub fn score_one(&self, phenotype: &Phenotype, archive: &[Phenotype]) -> f32 {
        archive
            .iter()
            .map(|entry| phenotype.distance(entry))
            .fold(self.ceiling, f32::min)
    }

    /// Novelty of every phenotype against the same archive snapshot.
    ///
    /// Each score depends only on its own phenotype, so the output is
    /// independent of batch order.
    pub fn score(&self, phenotypes: &[Phenotype], archive: &[Phenotype]) -> Vec<f32> {
        phenotypes
            .par_iter()
            .map(|phenotype| self.score_one(phenotype, archive))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shape() -> ImageShape {
        ImageShape::new(4, 4, 1)
    }

    #[test]
    fn test_empty_archive_gives_ceiling() {
        let scorer = NoveltyScorer::new(shape());
        assert_eq!(scorer.ceiling(), 4.0);

        let candidates = vec![Phenotype::filled(shape(), 0.0), Phenotype::filled(shape(), 0.7)];
        assert_eq!(scorer.score(&candidates, &[]), vec![4.0, 4.0]);
    }

    #[test]
    fn test_identical_entry_scores_zero() {
        let scorer = NoveltyScorer::new(shape());
        let black = Phenotype::filled(shape(), 0.0);
        assert_eq!(scorer.score_one(&black, &[black.clone()]), 0.0);
    }

    #[test]
    fn test_single_opposite_entry_scores_maximum() {
        let scorer = NoveltyScorer::new(shape());
        let black = Phenotype::filled(shape(), 0.0);
        let white = Phenotype::filled(shape(), 1.0);
        assert_eq!(scorer.score_one(&black, &[white]), 4.0);
    }

    #[test]
    fn test_nearest_neighbor_wins() {
        let scorer = NoveltyScorer::new(shape());
        let archive = vec![
            Phenotype::filled(shape(), 1.0),
            Phenotype::filled(shape(), 0.25),
            Phenotype::filled(shape(), 0.75),
        ];
        let candidate = Phenotype::filled(shape(), 0.0);
        // 16 samples each 0.25 apart: sqrt(16 * 0.0625) = 1.0
        assert_eq!(scorer.score_one(&candidate, &archive), 1.0);
    }

    fn phenotype_strategy() -> impl Strategy<Value = Phenotype> {
        prop::collection::vec(0.0f32..=1.0, 16)
            .prop_map(|values| Phenotype::new(ImageShape::new(4, 4, 1), values).unwrap())
    }

    proptest! {
        #[test]
        fn prop_score_is_min_distance_below_ceiling(
            candidate in phenotype_strategy(),
            archive in prop::collection::vec(phenotype_strategy(), 1..6),
        ) {
            let scorer = NoveltyScorer::new(shape());
            let score = scorer.score_one(&candidate, &archive);
            let min = archive
                .iter()
                .map(|a| candidate.distance(a))
                .fold(f32::INFINITY, f32::min);

            prop_assert!(score <= scorer.ceiling());
            prop_assert_eq!(score, min.min(scorer.ceiling()));
        }

        #[test]
        fn prop_scoring_ignores_batch_order(
            batch in prop::collection::vec(phenotype_strategy(), 1..8),
            archive in prop::collection::vec(phenotype_strategy(), 0..4),
        ) {
            let scorer = NoveltyScorer::new(shape());
            let forward = scorer.score(&batch, &archive);

            let reversed: Vec<_> = batch.iter().rev().cloned().collect();
            let mut backward = scorer.score(&reversed, &archive);
            backward.reverse();

            prop_assert_eq!(forward, backward);
        }
    }
}
