//! Genome manipulation utilities for the pattern population.
//!
//! Provides random generation, crossover, and mutation operations.

use crate::schema::{ChannelGenome, GenomeBounds, PatternGenome, WaveGenome};
use rand::prelude::*;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a random genome with `channels` wave stacks.
    pub fn random_genome(
        &mut self,
        channels: usize,
        waves_per_channel: usize,
        bounds: &GenomeBounds,
    ) -> PatternGenome {
        let waves = waves_per_channel.clamp(bounds.wave_count.0, bounds.wave_count.1);
        PatternGenome {
            channels: (0..channels)
                .map(|_| ChannelGenome {
                    bias: self.uniform(bounds.bias),
                    waves: (0..waves).map(|_| self.random_wave(bounds)).collect(),
                })
                .collect(),
        }
    }

    /// Generate random wave genome.
    fn random_wave(&mut self, bounds: &GenomeBounds) -> WaveGenome {
        WaveGenome {
            freq_x: self.uniform(bounds.frequency),
            freq_y: self.uniform(bounds.frequency),
            radial: self.uniform(bounds.radial),
            phase: self.uniform(bounds.phase),
            amplitude: self.uniform(bounds.amplitude),
        }
    }

    fn uniform(&mut self, bounds: (f32, f32)) -> f32 {
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    /// Gaussian mutation: add noise to a value.
    pub fn gaussian_mutate(&mut self, value: f32, strength: f32, bounds: (f32, f32)) -> f32 {
        let noise: f32 = self.rng.sample(rand_distr::StandardNormal);
        let mutated = value + noise * strength * (bounds.1 - bounds.0);
        mutated.clamp(bounds.0, bounds.1)
    }

    /// Perform crossover between two genomes.
    ///
    /// Channels are blended pairwise; waves beyond the shorter parent's
    /// stack are inherited from either parent at random.
    pub fn crossover(&mut self, parent1: &PatternGenome, parent2: &PatternGenome) -> PatternGenome {
        PatternGenome {
            channels: parent1
                .channels
                .iter()
                .zip(&parent2.channels)
                .map(|(c1, c2)| self.crossover_channel(c1, c2))
                .collect(),
        }
    }

    fn crossover_channel(&mut self, c1: &ChannelGenome, c2: &ChannelGenome) -> ChannelGenome {
        let t = self.rng.r#gen::<f32>();
        let shared = c1.waves.len().min(c2.waves.len());

        let mut waves: Vec<WaveGenome> = c1
            .waves
            .iter()
            .zip(&c2.waves)
            .map(|(w1, w2)| WaveGenome {
                freq_x: blend(w1.freq_x, w2.freq_x, t),
                freq_y: blend(w1.freq_y, w2.freq_y, t),
                radial: blend(w1.radial, w2.radial, t),
                phase: blend(w1.phase, w2.phase, t),
                amplitude: blend(w1.amplitude, w2.amplitude, t),
            })
            .collect();

        let longer = if c1.waves.len() >= c2.waves.len() {
            c1
        } else {
            c2
        };
        for wave in &longer.waves[shared..] {
            if self.rng.gen_bool(0.5) {
                waves.push(*wave);
            }
        }

        ChannelGenome {
            bias: blend(c1.bias, c2.bias, t),
            waves,
        }
    }

    /// Mutate a genome.
    pub fn mutate(
        &mut self,
        genome: &mut PatternGenome,
        rate: f32,
        strength: f32,
        bounds: &GenomeBounds,
    ) {
        for channel in &mut genome.channels {
            self.mutate_channel(channel, rate, strength, bounds);
        }
    }

    fn mutate_channel(
        &mut self,
        channel: &mut ChannelGenome,
        rate: f32,
        strength: f32,
        bounds: &GenomeBounds,
    ) {
        if self.rng.r#gen::<f32>() < rate {
            channel.bias = self.gaussian_mutate(channel.bias, strength, bounds.bias);
        }

        for wave in &mut channel.waves {
            self.mutate_wave(wave, rate, strength, bounds);
        }

        // Occasionally add or remove a wave
        if self.rng.r#gen::<f32>() < rate * 0.1 && channel.waves.len() < bounds.wave_count.1 {
            channel.waves.push(self.random_wave(bounds));
        }
        if self.rng.r#gen::<f32>() < rate * 0.1 && channel.waves.len() > bounds.wave_count.0 {
            let idx = self.rng.gen_range(0..channel.waves.len());
            channel.waves.remove(idx);
        }
    }

    fn mutate_wave(&mut self, wave: &mut WaveGenome, rate: f32, strength: f32, bounds: &GenomeBounds) {
        if self.rng.r#gen::<f32>() < rate {
            wave.freq_x = self.gaussian_mutate(wave.freq_x, strength, bounds.frequency);
        }
        if self.rng.r#gen::<f32>() < rate {
            wave.freq_y = self.gaussian_mutate(wave.freq_y, strength, bounds.frequency);
        }
        if self.rng.r#gen::<f32>() < rate {
            wave.radial = self.gaussian_mutate(wave.radial, strength, bounds.radial);
        }
        if self.rng.r#gen::<f32>() < rate {
            wave.phase = self.gaussian_mutate(wave.phase, strength, bounds.phase);
        }
        if self.rng.r#gen::<f32>() < rate {
            wave.amplitude = self.gaussian_mutate(wave.amplitude, strength, bounds.amplitude);
        }
    }

    /// Uniform draw in [0, 1).
    pub fn unit(&mut self) -> f32 {
        self.rng.r#gen()
    }

    /// Uniform index in `0..len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Linear blend between two values.
fn blend(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
