//! Shared rendering engine: lazy, once-only, coalesced initialisation.
//!
//! Binding libpdfium is slow (a `dlopen` plus library init) and must happen
//! at most once per process. [`EngineCell`] wraps a `tokio::sync::OnceCell`:
//! the first caller runs the [`EngineLoader`] on the blocking pool while any
//! concurrent callers await the same in-flight initialisation. Once set the
//! engine is handed out as a shared, read-only `Arc`. A failed load is not
//! cached; the next caller tries again.
//!
//! The engine itself is abstracted behind [`DocumentEngine`] /
//! [`LoadedDocument`] so the rasterisation steps can be exercised without a
//! native library.

use crate::error::ReviewError;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Native page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Pixel-space render target for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Scale a page to pixels, rounding each axis.
    ///
    /// Fails with [`ReviewError::InvalidGeometry`] if either side is zero.
    pub fn at_scale(size: PageSize, scale: f32) -> Result<Self, ReviewError> {
        // `as` saturates: negative and NaN become 0.
        let width = (size.width_pt * scale).round() as u32;
        let height = (size.height_pt * scale).round() as u32;
        if width == 0 || height == 0 {
            return Err(ReviewError::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }
}

/// A document renderer.
pub trait DocumentEngine: Send + Sync + 'static {
    /// Decode `bytes` into a document handle borrowing both.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn LoadedDocument + 'a>, ReviewError>;
}

/// An open document.
pub trait LoadedDocument {
    fn page_count(&self) -> usize;

    fn page_size(&self, index: usize) -> Result<PageSize, ReviewError>;

    /// Render page `index` into a surface of exactly `viewport` pixels.
    fn render(&self, index: usize, viewport: Viewport) -> Result<RgbaImage, ReviewError>;
}

/// One-shot engine constructor. Runs on the blocking pool.
pub trait EngineLoader: Send + Sync + 'static {
    type Engine: DocumentEngine;

    fn load(&self) -> Result<Self::Engine, ReviewError>;
}

pub struct EngineCell<E> {
    cell: OnceCell<Arc<E>>,
}

impl<E> Default for EngineCell<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EngineCell<E> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The engine, if already initialised.
    pub fn get(&self) -> Option<Arc<E>> {
        self.cell.get().cloned()
    }
}

impl<E: DocumentEngine> EngineCell<E> {
    /// Return the engine, running `loader` first if nobody has yet.
    pub async fn get_or_load<L>(&self, loader: &Arc<L>) -> Result<Arc<E>, ReviewError>
    where
        L: EngineLoader<Engine = E>,
    {
        let loader = Arc::clone(loader);
        let engine = self
            .cell
            .get_or_try_init(|| async move {
                let engine = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| ReviewError::Internal(format!("Engine load task panicked: {e}")))??;
                info!("Rendering engine initialised");
                Ok::<_, ReviewError>(Arc::new(engine))
            })
            .await?;
        Ok(Arc::clone(engine))
    }
}
