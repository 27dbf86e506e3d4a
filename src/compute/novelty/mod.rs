//! Novelty evaluation engine.
//!
//! Scores a batch of genomes by how far their rendered phenotypes are from
//! everything seen before, rather than by similarity to a target image.
//!
//! # Overview
//!
//! - **Render dispatch** (`dispatch`): parallel renders on a fixed worker pool
//! - **Scoring** (`scorer`): nearest-neighbor distance to the archive
//! - **Archive** (`archive`): append-only store of normalized phenotypes
//! - **Snapshots** (`snapshot`): stochastic admission and PNG output
//! - **Evaluator** (`evaluator`): the once-per-generation entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use picture_novelty::compute::PatternRenderer;
//! use picture_novelty::compute::novelty::NoveltyEvaluator;
//! use picture_novelty::schema::NoveltyConfig;
//!
//! let mut evaluator =
//!     NoveltyEvaluator::new(NoveltyConfig::default(), &PatternRenderer::renderer_set())?;
//! # let genomes: Vec<picture_novelty::schema::PatternGenome> = Vec::new();
//! let report = evaluator.evaluate(&genomes)?;
//! println!("{} archive entries", report.archive_size);
//! # Ok::<(), picture_novelty::compute::novelty::NoveltyError>(())
//! ```

use std::io;
use std::path::PathBuf;

use crate::compute::{ImageShape, RenderError};
use crate::schema::{ConfigError, Scheme};

mod archive;
mod dispatch;
mod evaluator;
mod scorer;
mod snapshot;

pub use archive::{ArchiveExport, NoveltyArchive};
pub use dispatch::RenderDispatcher;
pub use evaluator::{EvaluationReport, NoveltyEvaluator};
pub use scorer::NoveltyScorer;
pub use snapshot::{SnapshotSampler, save_png};

/// Errors raised while evaluating a batch. None of them are recoverable
/// within the batch.
#[derive(Debug, thiserror::Error)]
pub enum NoveltyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to build render pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to write snapshot {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image of shape {shape:?} cannot be written in the {scheme} scheme")]
    SnapshotBuffer { shape: ImageShape, scheme: Scheme },
    #[error("Archive entry shape {found:?} does not match archive shape {expected:?}")]
    ArchiveShape {
        expected: ImageShape,
        found: ImageShape,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Archive serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
