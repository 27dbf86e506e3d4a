//! Genome types for the built-in pattern renderer.
//!
//! A `PatternGenome` describes an image as one layered wave function per
//! output channel. It is deliberately small: the novelty evaluator treats
//! genomes as opaque, so any representation with a matching renderer works.

use serde::{Deserialize, Serialize};

/// Complete genome: one wave stack per output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternGenome {
    /// Per-channel wave stacks (1 for mono/gray, 3 for color).
    pub channels: Vec<ChannelGenome>,
}

/// Wave stack for one output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGenome {
    /// Constant offset added before the waves.
    pub bias: f32,
    /// Summed wave terms.
    pub waves: Vec<WaveGenome>,
}

/// Single wave term evaluated over centered coordinates in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveGenome {
    /// Frequency along X.
    pub freq_x: f32,
    /// Frequency along Y.
    pub freq_y: f32,
    /// Frequency along the distance from the image center.
    pub radial: f32,
    /// Phase offset in radians.
    pub phase: f32,
    /// Amplitude.
    pub amplitude: f32,
}

impl WaveGenome {
    /// Evaluate at centered coordinates.
    #[inline]
    pub fn eval(&self, x: f32, y: f32) -> f32 {
        let r = (x * x + y * y).sqrt();
        self.amplitude * (self.freq_x * x + self.freq_y * y + self.radial * r + self.phase).sin()
    }
}

impl ChannelGenome {
    /// Evaluate the channel activation at centered coordinates.
    #[inline]
    pub fn eval(&self, x: f32, y: f32) -> f32 {
        self.bias + self.waves.iter().map(|w| w.eval(x, y)).sum::<f32>()
    }
}

/// Parameter bounds for genome generation and mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeBounds {
    pub frequency: (f32, f32),
    pub radial: (f32, f32),
    pub phase: (f32, f32),
    pub amplitude: (f32, f32),
    pub bias: (f32, f32),
    /// Min/max number of waves per channel.
    pub wave_count: (usize, usize),
}

impl Default for GenomeBounds {
    fn default() -> Self {
        Self {
            frequency: (-8.0, 8.0),
            radial: (-8.0, 8.0),
            phase: (0.0, std::f32::consts::TAU),
            amplitude: (-1.0, 1.0),
            bias: (-0.5, 0.5),
            wave_count: (1, 8),
        }
    }
}
