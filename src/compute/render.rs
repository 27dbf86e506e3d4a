//! Renderer capability lookup and the built-in pattern renderer.

use std::collections::HashMap;
use std::sync::Arc;

use super::raster::{ImageShape, RenderedImage};
use crate::schema::{ConfigError, PatternGenome, Scheme};

/// Turns a genome into a raw image of the requested size.
///
/// Implementations must be pure: the same genome and size always yield the
/// same samples, with `scheme.channels()` channels for the scheme the
/// renderer is registered under.
pub trait Renderer<G>: Send + Sync {
    fn render(&self, genome: &G, width: usize, height: usize) -> Result<RenderedImage, RenderError>;
}

impl<G, F> Renderer<G> for F
where
    F: Fn(&G, usize, usize) -> Result<RenderedImage, RenderError> + Send + Sync,
{
    fn render(&self, genome: &G, width: usize, height: usize) -> Result<RenderedImage, RenderError> {
        self(genome, width, height)
    }
}

/// Render failures. Fatal for the batch that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render failed: {0}")]
    Failed(String),
    #[error("Render produced {found} samples, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("Render produced {found} channels, scheme expects {expected}")]
    ChannelMismatch { expected: usize, found: usize },
    #[error("No genome at index {index} in a batch of {len}")]
    MissingGenome { index: usize, len: usize },
}

/// Mapping from scheme to renderer.
pub struct RendererSet<G> {
    renderers: HashMap<Scheme, Arc<dyn Renderer<G>>>,
}

impl<G> Default for RendererSet<G> {
    fn default() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }
}

impl<G> RendererSet<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the renderer used for `scheme`, replacing any previous one.
    pub fn with<R>(mut self, scheme: Scheme, renderer: R) -> Self
    where
        R: Renderer<G> + 'static,
    {
        self.renderers.insert(scheme, Arc::new(renderer));
        self
    }

    /// Look up the renderer for `scheme`.
    pub fn get(&self, scheme: Scheme) -> Result<Arc<dyn Renderer<G>>, ConfigError> {
        self.renderers
            .get(&scheme)
            .cloned()
            .ok_or(ConfigError::MissingRenderer(scheme))
    }

    pub fn contains(&self, scheme: Scheme) -> bool {
        self.renderers.contains_key(&scheme)
    }
}

/// Renders `PatternGenome` wave stacks.
#[derive(Debug, Clone, Copy)]
pub struct PatternRenderer {
    scheme: Scheme,
}

impl PatternRenderer {
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }

    /// Renderer set covering every scheme.
    pub fn renderer_set() -> RendererSet<PatternGenome> {
        Scheme::ALL
            .into_iter()
            .fold(RendererSet::new(), |set, scheme| {
                set.with(scheme, PatternRenderer::new(scheme))
            })
    }
}

impl Renderer<PatternGenome> for PatternRenderer {
    fn render(
        &self,
        genome: &PatternGenome,
        width: usize,
        height: usize,
    ) -> Result<RenderedImage, RenderError> {
        let channels = self.scheme.channels();
        if genome.channels.len() < channels {
            return Err(RenderError::ChannelMismatch {
                expected: channels,
                found: genome.channels.len(),
            });
        }

        let mut samples = Vec::with_capacity(width * height * channels);
        for row in 0..height {
            let y = 2.0 * (row as f32 + 0.5) / height as f32 - 1.0;
            for col in 0..width {
                let x = 2.0 * (col as f32 + 0.5) / width as f32 - 1.0;
                for channel in &genome.channels[..channels] {
                    let v = channel.eval(x, y);
                    let sample = match self.scheme {
                        Scheme::Mono => {
                            if v > 0.0 {
                                255.0
                            } else {
                                0.0
                            }
                        }
                        // Unclipped: strong activations overshoot the display range.
                        Scheme::Gray | Scheme::Color => 127.5 * (1.0 + v),
                    };
                    samples.push(sample);
                }
            }
        }

        RenderedImage::new(ImageShape::new(width, height, channels), samples)
    }
}
