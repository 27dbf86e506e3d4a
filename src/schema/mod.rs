//! Schema module - Configuration and genome types for novelty search runs.

mod config;
mod genome;

pub use config::*;
pub use genome::*;
