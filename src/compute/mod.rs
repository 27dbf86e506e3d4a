//! Compute module - Rendering, novelty scoring and the population driver.

mod raster;
mod render;

pub mod evolution;
pub mod novelty;

pub use raster::*;
pub use render::*;
