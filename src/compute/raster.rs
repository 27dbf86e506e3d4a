//! Image representations moving through the novelty pipeline.
//!
//! Renders arrive as raw `f32` samples (`RenderedImage`), are clipped and
//! rounded to display bytes (`ClippedImage`) for persistence, and scaled to
//! the unit interval (`Phenotype`) for distance computation. All buffers are
//! row-major with interleaved channels.

use serde::{Deserialize, Serialize};

use super::render::RenderError;

/// Maximum display intensity.
pub const MAX_INTENSITY: f32 = 255.0;

/// Width, height and channel depth of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl ImageShape {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Total sample count.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height * self.channels
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw renderer output, not yet clipped to the display range.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    shape: ImageShape,
    samples: Vec<f32>,
}

impl RenderedImage {
    /// Wrap renderer samples, checking the buffer matches the shape.
    pub fn new(shape: ImageShape, samples: Vec<f32>) -> Result<Self, RenderError> {
        if samples.len() != shape.len() {
            return Err(RenderError::ShapeMismatch {
                expected: shape.len(),
                found: samples.len(),
            });
        }
        Ok(Self { shape, samples })
    }

    /// Image filled with a single value.
    pub fn filled(shape: ImageShape, value: f32) -> Self {
        Self {
            shape,
            samples: vec![value; shape.len()],
        }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Clip to [0, 255] and round to display bytes.
    pub fn clip(&self) -> ClippedImage {
        let pixels = self
            .samples
            .iter()
            .map(|&s| {
                // NaN clamps to 0 through the saturating cast.
                s.clamp(0.0, MAX_INTENSITY).round() as u8
            })
            .collect();
        ClippedImage {
            shape: self.shape,
            pixels,
        }
    }
}

/// Display-range image, the form written to snapshot files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClippedImage {
    shape: ImageShape,
    pixels: Vec<u8>,
}

impl ClippedImage {
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Scale to the unit interval.
    pub fn normalize(&self) -> Phenotype {
        Phenotype {
            shape: self.shape,
            values: self
                .pixels
                .iter()
                .map(|&p| p as f32 / MAX_INTENSITY)
                .collect(),
        }
    }
}

/// Normalized phenotype used for novelty distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    shape: ImageShape,
    values: Vec<f32>,
}

impl Phenotype {
    /// Build from unit-interval values.
    pub fn new(shape: ImageShape, values: Vec<f32>) -> Result<Self, RenderError> {
        if values.len() != shape.len() {
            return Err(RenderError::ShapeMismatch {
                expected: shape.len(),
                found: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Phenotype with every value set to `value`.
    pub fn filled(shape: ImageShape, value: f32) -> Self {
        Self {
            shape,
            values: vec![value; shape.len()],
        }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Euclidean distance between the flattened phenotypes.
    ///
    /// Both phenotypes must share a shape.
    pub fn distance(&self, other: &Phenotype) -> f32 {
        debug_assert_eq!(self.shape, other.shape);
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// Rescale back to display bytes.
    pub fn to_display(&self) -> ClippedImage {
        ClippedImage {
            shape: self.shape,
            pixels: self
                .values
                .iter()
                .map(|&v| (v * MAX_INTENSITY).clamp(0.0, MAX_INTENSITY).round() as u8)
                .collect(),
        }
    }
}
