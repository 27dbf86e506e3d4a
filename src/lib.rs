//! Picture Novelty - novelty search fitness for image-generating genomes.
//!
//! Genomes are scored by how different their rendered image is from every
//! image seen before, instead of by similarity to a target. The archive of
//! seen images grows as the search runs, so fitness keeps pushing the
//! population toward unexplored pictures.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration and genome types
//! - `compute`: Rendering, novelty evaluation and the population driver
//!
//! # Example
//!
//! ```rust,no_run
//! use picture_novelty::{
//!     compute::{PatternRenderer, evolution::GenomeRng, novelty::NoveltyEvaluator},
//!     schema::{GenomeBounds, NoveltyConfig},
//! };
//!
//! let config = NoveltyConfig::default();
//! let mut evaluator = NoveltyEvaluator::new(config, &PatternRenderer::renderer_set())?;
//!
//! let mut rng = GenomeRng::new(42);
//! let genomes: Vec<_> = (0..16)
//!     .map(|_| rng.random_genome(1, 4, &GenomeBounds::default()))
//!     .collect();
//!
//! let report = evaluator.evaluate(&genomes)?;
//! println!("Fitness: {:?}", report.fitness);
//! # Ok::<(), picture_novelty::compute::novelty::NoveltyError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::NoveltyRun;
pub use compute::novelty::{EvaluationReport, NoveltyError, NoveltyEvaluator};
pub use schema::{NoveltyConfig, RunConfig, Scheme};
