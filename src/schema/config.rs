//! Configuration types for novelty evaluation and the run driver.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pixel scheme of rendered phenotypes.
///
/// Fixed for the lifetime of an evaluator: it decides the channel depth of
/// every render, the PNG encoding of snapshots and which renderer is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Black and white, one channel with samples at 0 or 255.
    Mono,
    /// Grayscale, one channel.
    #[default]
    Gray,
    /// RGB, three channels.
    Color,
}

impl Scheme {
    /// All schemes, in declaration order.
    pub const ALL: [Scheme; 3] = [Scheme::Mono, Scheme::Gray, Scheme::Color];

    /// Number of output channels a render in this scheme carries.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            Scheme::Mono | Scheme::Gray => 1,
            Scheme::Color => 3,
        }
    }

    /// Lowercase name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Mono => "mono",
            Scheme::Gray => "gray",
            Scheme::Color => "color",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scheme::ALL
            .into_iter()
            .find(|scheme| scheme.name() == s)
            .ok_or_else(|| ConfigError::UnknownScheme(s.to_string()))
    }
}

fn default_dimension() -> usize {
    32
}
fn default_full_scale() -> usize {
    32
}
fn default_workers() -> usize {
    4
}
fn default_admission_probability() -> f64 {
    0.02
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Novelty evaluator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoveltyConfig {
    /// Evaluation render width in pixels.
    #[serde(default = "default_dimension")]
    pub width: usize,
    /// Evaluation render height in pixels.
    #[serde(default = "default_dimension")]
    pub height: usize,
    /// Upscale factor for snapshot renders relative to the evaluation size.
    #[serde(default = "default_full_scale")]
    pub full_scale: usize,
    /// Render worker pool size.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pixel scheme.
    #[serde(default)]
    pub scheme: Scheme,
    /// Probability that a single evaluated genome is admitted to the archive.
    #[serde(default = "default_admission_probability")]
    pub admission_probability: f64,
    /// Directory receiving snapshot PNGs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Seed for the admission RNG. Entropy when unset.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Optional archive bound. The archive grows without limit when unset.
    #[serde(default)]
    pub max_archive_size: Option<usize>,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            full_scale: default_full_scale(),
            workers: default_workers(),
            scheme: Scheme::default(),
            admission_probability: default_admission_probability(),
            output_dir: default_output_dir(),
            random_seed: None,
            max_archive_size: None,
        }
    }
}

impl NoveltyConfig {
    /// Output channel count derived from the scheme.
    #[inline]
    pub fn channels(&self) -> usize {
        self.scheme.channels()
    }

    /// Snapshot render width.
    #[inline]
    pub fn full_width(&self) -> usize {
        self.width * self.full_scale
    }

    /// Snapshot render height.
    #[inline]
    pub fn full_height(&self) -> usize {
        self.height * self.full_scale
    }

    /// Fitness given to every genome while the archive is empty.
    pub fn fitness_ceiling(&self) -> f32 {
        ((self.width * self.height * self.channels()) as f32).sqrt()
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.full_scale == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if !(0.0..=1.0).contains(&self.admission_probability) {
            return Err(ConfigError::InvalidAdmissionProbability(
                self.admission_probability,
            ));
        }
        if self.max_archive_size == Some(0) {
            return Err(ConfigError::InvalidArchiveSize);
        }
        Ok(())
    }
}

fn default_population_size() -> usize {
    100
}
fn default_max_fitness_threshold() -> f32 {
    1e38
}
fn default_mutation_rate() -> f32 {
    0.2
}
fn default_mutation_strength() -> f32 {
    0.15
}
fn default_crossover_rate() -> f32 {
    0.7
}
fn default_tournament_size() -> usize {
    3
}
fn default_elitism() -> usize {
    2
}
fn default_waves_per_channel() -> usize {
    4
}

/// Population settings for the run driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of genomes per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Stop once the best fitness of a generation reaches this value.
    #[serde(default = "default_max_fitness_threshold")]
    pub max_fitness_threshold: f32,
    /// Per-gene mutation probability (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Mutation strength as a fraction of each gene's range.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f32,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f32,
    /// Tournament size for parent selection.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Number of best genomes copied unchanged into the next generation.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// Waves per output channel in freshly generated genomes.
    #[serde(default = "default_waves_per_channel")]
    pub waves_per_channel: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_fitness_threshold: default_max_fitness_threshold(),
            mutation_rate: default_mutation_rate(),
            mutation_strength: default_mutation_strength(),
            crossover_rate: default_crossover_rate(),
            tournament_size: default_tournament_size(),
            elitism: default_elitism(),
            waves_per_channel: default_waves_per_channel(),
        }
    }
}

impl PopulationConfig {
    /// Validate population parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        if self.tournament_size == 0 || self.waves_per_channel == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        Ok(())
    }
}

fn default_checkpoint_interval() -> usize {
    1
}

/// Top-level run configuration, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Novelty evaluator settings.
    #[serde(default)]
    pub novelty: NoveltyConfig,
    /// Population settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Number of generations to run. Runs until the fitness threshold when unset.
    #[serde(default)]
    pub generations: Option<usize>,
    /// Generations between archive checkpoints. Zero saves only when the run stops.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            novelty: NoveltyConfig::default(),
            population: PopulationConfig::default(),
            generations: None,
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

impl RunConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.novelty.validate()?;
        self.population.validate()
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Image dimensions (width, height, full_scale) must be non-zero")]
    InvalidDimensions,
    #[error("Worker pool size must be non-zero")]
    InvalidWorkers,
    #[error("Admission probability {0} is outside [0, 1]")]
    InvalidAdmissionProbability(f64),
    #[error("Maximum archive size must be non-zero when set")]
    InvalidArchiveSize,
    #[error("Population size, tournament size and waves per channel must be non-zero")]
    InvalidPopulationSize,
    #[error("Unexpected scheme: {0:?}")]
    UnknownScheme(String),
    #[error("No renderer registered for scheme {0}")]
    MissingRenderer(Scheme),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_channels() {
        assert_eq!(Scheme::Mono.channels(), 1);
        assert_eq!(Scheme::Gray.channels(), 1);
        assert_eq!(Scheme::Color.channels(), 3);
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("color".parse::<Scheme>().unwrap(), Scheme::Color);
        assert!(matches!(
            "sepia".parse::<Scheme>(),
            Err(ConfigError::UnknownScheme(name)) if name == "sepia"
        ));
    }

    #[test]
    fn test_scheme_serde_rejects_unknown() {
        assert_eq!(
            serde_json::from_str::<Scheme>("\"mono\"").unwrap(),
            Scheme::Mono
        );
        assert!(serde_json::from_str::<Scheme>("\"sepia\"").is_err());
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = NoveltyConfig::default();
        assert_eq!((config.width, config.height), (32, 32));
        assert_eq!(config.full_width(), 1024);
        assert_eq!(config.workers, 4);
        assert_eq!(config.scheme, Scheme::Gray);
        assert!((config.admission_probability - 0.02).abs() < 1e-12);
        assert_eq!(config.fitness_ceiling(), 32.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = NoveltyConfig {
            admission_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAdmissionProbability(_))
        ));

        let config = NoveltyConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWorkers)));

        let config = RunConfig {
            population: PopulationConfig {
                size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_config_partial_json() {
        let config: RunConfig =
            serde_json::from_str(r#"{"novelty": {"scheme": "color", "width": 8}}"#).unwrap();
        assert_eq!(config.novelty.scheme, Scheme::Color);
        assert_eq!(config.novelty.width, 8);
        assert_eq!(config.novelty.height, 32);
        assert_eq!(config.population.size, 100);
        assert_eq!(config.generations, None);
        assert_eq!(config.checkpoint_interval, 1);
    }
}
