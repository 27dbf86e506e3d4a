//! Stochastic archive admission and PNG snapshot persistence.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use rand::prelude::*;

use super::NoveltyError;
use crate::compute::{ClippedImage, RenderedImage};
use crate::schema::{ConfigError, Scheme};

const SNAPSHOT_PREFIX: &str = "novelty-";
const WINNER_PREFIX: &str = "winning-novelty-";

/// Decides which genomes of a batch are admitted and writes their snapshots.
#[derive(Debug)]
pub struct SnapshotSampler {
    output_dir: PathBuf,
    scheme: Scheme,
    admission_probability: f64,
    rng: StdRng,
    /// Index of the next admitted snapshot. Starts at 1.
    next_index: u64,
    /// Highest generation with a winner snapshot already on disk.
    last_winner: usize,
}

impl SnapshotSampler {
    /// Create a sampler writing into `output_dir`, creating it if needed.
    ///
    /// Numbering continues after any snapshots already in `output_dir`, so a
    /// resumed run never overwrites earlier files.
    pub fn new<P: AsRef<Path>>(
        output_dir: P,
        scheme: Scheme,
        admission_probability: f64,
        seed: Option<u64>,
    ) -> Result<Self, NoveltyError> {
        if !(0.0..=1.0).contains(&admission_probability) {
            return Err(ConfigError::InvalidAdmissionProbability(admission_probability).into());
        }

        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;

        let next_index = highest_index(&output_dir, SNAPSHOT_PREFIX)? + 1;
        let last_winner = highest_index(&output_dir, WINNER_PREFIX)? as usize;
        if next_index > 1 || last_winner > 0 {
            log::info!(
                "Continuing snapshot numbering in {:?} at {} (last winner generation {})",
                output_dir,
                next_index,
                last_winner
            );
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            output_dir,
            scheme,
            admission_probability,
            rng,
            next_index,
            last_winner,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Index the next admitted snapshot will be written under.
    pub fn output_index(&self) -> u64 {
        self.next_index
    }

    /// Highest generation whose winner snapshot exists. Zero when none does.
    pub fn last_winner_generation(&self) -> usize {
        self.last_winner
    }

    /// Draw one admission decision per genome, in batch order.
    ///
    /// Returns the indices of admitted genomes.
    pub fn draw_admissions(&mut self, count: usize) -> Vec<usize> {
        (0..count)
            .filter(|_| self.rng.gen_bool(self.admission_probability))
            .collect()
    }

    /// Path of the snapshot for output index `index`.
    pub fn snapshot_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{SNAPSHOT_PREFIX}{index:06}.png"))
    }

    /// Path of the winner snapshot for `generation`.
    pub fn winner_path(&self, generation: usize) -> PathBuf {
        self.output_dir
            .join(format!("{WINNER_PREFIX}{generation:06}.png"))
    }

    /// Persist an admitted high-resolution render and advance the output index.
    pub fn persist(&mut self, image: &RenderedImage) -> Result<PathBuf, NoveltyError> {
        let path = self.snapshot_path(self.next_index);
        save_png(&image.clip(), self.scheme, &path)?;
        log::debug!("Saved snapshot {} to {:?}", self.next_index, path);
        self.next_index += 1;
        Ok(path)
    }

    /// Persist a generation winner. Does not touch the output index.
    pub fn persist_winner(
        &mut self,
        image: &RenderedImage,
        generation: usize,
    ) -> Result<PathBuf, NoveltyError> {
        let path = self.winner_path(generation);
        save_png(&image.clip(), self.scheme, &path)?;
        log::debug!("Saved generation {} winner to {:?}", generation, path);
        self.last_winner = self.last_winner.max(generation);
        Ok(path)
    }
}

/// Highest `{prefix}{index}.png` index among the files in `dir`.
fn highest_index(dir: &Path, prefix: &str) -> Result<u64, NoveltyError> {
    let mut highest = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let index = name
            .to_str()
            .and_then(|name| name.strip_prefix(prefix))
            .and_then(|rest| rest.strip_suffix(".png"))
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u64>().ok());
        if let Some(index) = index {
            highest = highest.max(index);
        }
    }
    Ok(highest)
}

/// Write a clipped image as PNG: luma for mono and gray, RGB for color.
pub fn save_png(image: &ClippedImage, scheme: Scheme, path: &Path) -> Result<(), NoveltyError> {
    let shape = image.shape();
    if shape.channels != scheme.channels() {
        return Err(NoveltyError::SnapshotBuffer { shape, scheme });
    }

    let (width, height) = (shape.width as u32, shape.height as u32);
    let pixels = image.pixels().to_vec();
    let result = match scheme {
        Scheme::Mono | Scheme::Gray => GrayImage::from_raw(width, height, pixels)
            .ok_or(NoveltyError::SnapshotBuffer { shape, scheme })?
            .save(path),
        Scheme::Color => RgbImage::from_raw(width, height, pixels)
            .ok_or(NoveltyError::SnapshotBuffer { shape, scheme })?
            .save(path),
    };

    result.map_err(|source| NoveltyError::Persist {
        path: path.to_path_buf(),
        source,
    })
}
