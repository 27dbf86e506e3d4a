//! Novelty archive of previously observed phenotypes.

use std::fs;
use std::path::Path;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::NoveltyError;
use crate::compute::{ImageShape, Phenotype};

/// Ordered collection of normalized phenotypes sharing one shape.
///
/// Entries are only appended. When a maximum size is set, the archive keeps
/// a uniform reservoir sample of every phenotype ever offered to it.
#[derive(Debug)]
pub struct NoveltyArchive {
    shape: ImageShape,
    entries: Vec<Phenotype>,
    /// Optional bound on stored entries.
    max_size: Option<usize>,
    /// Total phenotypes ever offered, including evicted ones.
    seen: u64,
    rng: StdRng,
}

impl NoveltyArchive {
    /// Create an empty, unbounded archive.
    pub fn new(shape: ImageShape) -> Self {
        Self {
            shape,
            entries: Vec::new(),
            max_size: None,
            seen: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Bound the archive to `max_size` entries using reservoir sampling.
    pub fn with_max_size(mut self, max_size: usize, seed: Option<u64>) -> Self {
        self.max_size = Some(max_size.max(1));
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Immutable view of the current entries.
    pub fn snapshot(&self) -> &[Phenotype] {
        &self.entries
    }

    /// Get archive size.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if archive is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total phenotypes offered to the archive so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Append a single phenotype.
    pub fn push(&mut self, phenotype: Phenotype) -> Result<(), NoveltyError> {
        self.check_shape(&phenotype)?;
        self.insert(phenotype);
        Ok(())
    }

    /// Append a batch of phenotypes.
    ///
    /// Shapes are checked up front, so a rejected batch leaves the archive
    /// unchanged.
    pub fn extend(&mut self, phenotypes: Vec<Phenotype>) -> Result<(), NoveltyError> {
        for phenotype in &phenotypes {
            self.check_shape(phenotype)?;
        }
        for phenotype in phenotypes {
            self.insert(phenotype);
        }
        Ok(())
    }

    fn check_shape(&self, phenotype: &Phenotype) -> Result<(), NoveltyError> {
        if phenotype.shape() != self.shape {
            return Err(NoveltyError::ArchiveShape {
                expected: self.shape,
                found: phenotype.shape(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, phenotype: Phenotype) {
        self.seen += 1;
        match self.max_size {
            Some(max) if self.entries.len() >= max => {
                let slot = self.rng.gen_range(0..self.seen);
                if slot < max as u64 {
                    log::warn!(
                        "Archive full ({} entries), replacing entry {}",
                        max,
                        slot
                    );
                    self.entries[slot as usize] = phenotype;
                }
            }
            _ => self.entries.push(phenotype),
        }
    }

    /// Save the archive as JSON.
    ///
    /// Writes a sibling temporary file first and renames it over `path`, so an
    /// interrupted save leaves the previous file intact.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), NoveltyError> {
        let path = path.as_ref();
        let export = ArchiveExport {
            shape: self.shape,
            seen: self.seen,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&export)?;
        let partial = path.with_extension("json.partial");
        fs::write(&partial, json)?;
        fs::rename(&partial, path)?;
        Ok(())
    }

    /// Load an archive saved with [`NoveltyArchive::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, NoveltyError> {
        let content = fs::read_to_string(path)?;
        let export: ArchiveExport = serde_json::from_str(&content)?;

        let entries = export
            .entries
            .into_iter()
            .map(|entry| Phenotype::new(entry.shape(), entry.values().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut archive = Self::new(export.shape);
        archive.extend(entries)?;
        archive.seen = export.seen.max(archive.seen);
        Ok(archive)
    }
}

/// Exported archive format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveExport {
    /// Shape shared by every entry.
    pub shape: ImageShape,
    /// Phenotypes offered over the archive's lifetime.
    pub seen: u64,
    /// Stored phenotypes in archive order.
    pub entries: Vec<Phenotype>,
}
