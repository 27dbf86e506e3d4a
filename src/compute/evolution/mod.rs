//! Population driver for novelty search over pattern genomes.
//!
//! The novelty evaluator only scores genomes; this module plays the part of
//! the population engine around it.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Random generation, crossover, and mutation
//! - **Run Loop** (`search`): Evaluate, record the winner, breed the next generation
//!
//! # Example
//!
//! ```rust,no_run
//! use picture_novelty::compute::evolution::NoveltyRun;
//! use picture_novelty::schema::RunConfig;
//!
//! let config = RunConfig {
//!     generations: Some(10),
//!     ..Default::default()
//! };
//!
//! let mut run = NoveltyRun::new(config)?;
//! let result = run.run_with_callback(|progress| {
//!     println!("Generation {}: best novelty = {:.3}, {} archive entries",
//!         progress.generation, progress.best_fitness, progress.archive_size);
//! })?;
//! println!("Stopped: {:?}", result.stop_reason);
//! # Ok::<(), picture_novelty::compute::novelty::NoveltyError>(())
//! ```

mod genome;
mod search;

pub use genome::GenomeRng;
pub use search::{Candidate, NoveltyRun, RunProgress, RunResult, StopReason};
