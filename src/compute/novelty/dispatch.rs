//! Parallel render dispatch over a fixed-size worker pool.

use std::sync::Arc;

use rayon::prelude::*;

use super::NoveltyError;
use crate::compute::{ImageShape, RenderError, RenderedImage, Renderer, RendererSet};
use crate::schema::Scheme;

/// Fans renders out to a dedicated rayon pool.
pub struct RenderDispatcher<G> {
    pool: rayon::ThreadPool,
    renderer: Arc<dyn Renderer<G>>,
    scheme: Scheme,
}

impl<G: Sync> RenderDispatcher<G> {
    /// Build the pool and resolve the renderer for `scheme`.
    pub fn new(
        workers: usize,
        scheme: Scheme,
        renderers: &RendererSet<G>,
    ) -> Result<Self, NoveltyError> {
        let renderer = renderers.get(scheme)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("render-{i}"))
            .build()?;

        Ok(Self {
            pool,
            renderer,
            scheme,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Render every genome, returning images in input order.
    ///
    /// The first failing render fails the whole batch.
    pub fn dispatch(
        &self,
        genomes: &[G],
        width: usize,
        height: usize,
    ) -> Result<Vec<RenderedImage>, NoveltyError> {
        let images = self.pool.install(|| {
            genomes
                .par_iter()
                .map(|genome| self.render_checked(genome, width, height))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(images)
    }

    /// Render the genomes at `indices`, returning images in `indices` order.
    pub fn dispatch_subset(
        &self,
        genomes: &[G],
        indices: &[usize],
        width: usize,
        height: usize,
    ) -> Result<Vec<RenderedImage>, NoveltyError> {
        let images = self.pool.install(|| {
            indices
                .par_iter()
                .map(|&i| {
                    let genome = genomes.get(i).ok_or(RenderError::MissingGenome {
                        index: i,
                        len: genomes.len(),
                    })?;
                    self.render_checked(genome, width, height)
                })
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(images)
    }

    /// Render a single genome on the pool.
    pub fn render_one(
        &self,
        genome: &G,
        width: usize,
        height: usize,
    ) -> Result<RenderedImage, NoveltyError> {
        Ok(self
            .pool
            .install(|| self.render_checked(genome, width, height))?)
    }

    /// Run `op` inside the worker pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    fn render_checked(
        &self,
        genome: &G,
        width: usize,
        height: usize,
    ) -> Result<RenderedImage, RenderError> {
        let image = self.renderer.render(genome, width, height)?;
        let expected = ImageShape::new(width, height, self.scheme.channels());
        let found = image.shape();
        if found.channels != expected.channels {
            return Err(RenderError::ChannelMismatch {
                expected: expected.channels,
                found: found.channels,
            });
        }
        if found != expected {
            return Err(RenderError::ShapeMismatch {
                expected: expected.len(),
                found: found.len(),
            });
        }
        Ok(image)
    }
}
