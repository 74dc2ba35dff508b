//! PDF rasterisation: page 1 → PNG at a fixed oversampling factor.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which blocks and keeps
//! internal state. Opening the document, rendering and PNG encoding all run
//! on the blocking pool so Tokio worker threads never stall.
//!
//! ## Steps
//!
//! 1. obtain the shared engine ([`EngineCell`], initialised once)
//! 2. open the bytes; zero pages → `InvalidInput` (nothing is rendered)
//! 3. viewport = page size × scale; zero side → `InvalidGeometry`
//! 4. render page 1 into a surface of exactly that size, smoothing on;
//!    engine failure → `Internal`
//! 5. encode PNG; failure → `EncodingFailed`
//! 6. name the output `<stem>.png` and return it with a preview URL

use super::encode;
use super::engine::{DocumentEngine, EngineCell, EngineLoader, LoadedDocument, PageSize, Viewport};
use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::model::{ConversionResult, UploadedFile, PNG_MIME};
use async_trait::async_trait;
use image::RgbaImage;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Converts an uploaded PDF into a page-1 image.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, file: &UploadedFile) -> Result<ConversionResult, ReviewError>;
}

/// The process-wide pdfium engine. Never torn down.
static PDFIUM_ENGINE: Lazy<Arc<EngineCell<PdfiumEngine>>> = Lazy::new(|| Arc::new(EngineCell::new()));

pub struct Rasterizer<L: EngineLoader> {
    loader: Arc<L>,
    engine: Arc<EngineCell<L::Engine>>,
    scale: f32,
}

impl Rasterizer<PdfiumLoader> {
    /// Rasteriser backed by the process-wide pdfium engine.
    pub fn pdfium(config: &ReviewConfig) -> Self {
        Self::new(
            PdfiumLoader::from_config(config),
            Arc::clone(&PDFIUM_ENGINE),
            config.render_scale,
        )
    }
}

impl<L: EngineLoader> Rasterizer<L> {
    pub fn new(loader: L, engine: Arc<EngineCell<L::Engine>>, scale: f32) -> Self {
        Self {
            loader: Arc::new(loader),
            engine,
            scale,
        }
    }

    /// Rasterise page 1 of `file`.
    pub async fn convert(&self, file: &UploadedFile) -> Result<ConversionResult, ReviewError> {
        if !file.is_pdf() {
            return Err(ReviewError::invalid_input(format!(
                "'{}' is not a PDF (type '{}')",
                file.name(),
                file.mime_type()
            )));
        }

        let engine = self.engine.get_or_load(&self.loader).await?;
        let file = file.clone();
        let scale = self.scale;

        tokio::task::spawn_blocking(move || rasterize_first_page(engine.as_ref(), &file, scale))
            .await
            .map_err(|e| ReviewError::Internal(format!("Render task panicked: {e}")))?
    }
}

#[async_trait]
impl<L: EngineLoader> PageRasterizer for Rasterizer<L> {
    async fn rasterize(&self, file: &UploadedFile) -> Result<ConversionResult, ReviewError> {
        self.convert(file).await
    }
}

/// Blocking implementation of the rasterisation steps.
pub fn rasterize_first_page<E: DocumentEngine + ?Sized>(
    engine: &E,
    file: &UploadedFile,
    scale: f32,
) -> Result<ConversionResult, ReviewError> {
    let document = engine.open(file.bytes())?;

    let pages = document.page_count();
    if pages == 0 {
        return Err(ReviewError::invalid_input(format!("'{}' has no pages", file.name())));
    }
    debug!("{}: {} pages, rendering page 1", file.name(), pages);

    let size = document.page_size(0)?;
    let viewport = Viewport::at_scale(size, scale)?;
    let surface = document.render(0, viewport)?;
    let png = encode::encode_png(&surface)?;

    let name = png_file_name(file.name());
    info!(
        "Rasterised {} → {} ({}x{} px, {} bytes)",
        file.name(),
        name,
        viewport.width,
        viewport.height,
        png.len()
    );

    Ok(ConversionResult {
        image_url: encode::data_url(&png, PNG_MIME),
        file: UploadedFile::new(name, PNG_MIME, png),
        width: viewport.width,
        height: viewport.height,
    })
}

static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// `resume.PDF` → `resume.png`; names without a `.pdf` suffix keep their
/// full text as the stem.
pub fn png_file_name(source: &str) -> String {
    format!("{}.png", RE_PDF_SUFFIX.replace(source, ""))
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// Binds libpdfium, in order: explicit path (file or directory), the
/// current directory, then the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader {
    lib_path: Option<PathBuf>,
}

impl PdfiumLoader {
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    /// Use `config.pdfium_lib_path`, else `PDFIUM_LIB_PATH`.
    pub fn from_config(config: &ReviewConfig) -> Self {
        let lib_path = config.pdfium_lib_path.clone().or_else(|| {
            std::env::var("PDFIUM_LIB_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        });
        Self { lib_path }
    }
}

impl EngineLoader for PdfiumLoader {
    type Engine = PdfiumEngine;

    fn load(&self) -> Result<PdfiumEngine, ReviewError> {
        let bindings = match &self.lib_path {
            Some(path) => {
                let path = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(path)
                } else {
                    path.clone()
                };
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(&path)
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ReviewError::EngineUnavailable(format!("{e:?}")))?;

        Ok(PdfiumEngine {
            pdfium: Pdfium::new(bindings),
        })
    }
}

pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl DocumentEngine for PdfiumEngine {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn LoadedDocument + 'a>, ReviewError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ReviewError::invalid_input(format!("cannot open PDF: {e:?}")))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// The engine could not draw a page it had already opened and measured.
/// `EncodingFailed` stays reserved for PNG export.
fn render_failure(index: usize, cause: impl std::fmt::Debug) -> ReviewError {
    ReviewError::Internal(format!("page {} render failed: {cause:?}", index + 1))
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, ReviewError> {
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| ReviewError::invalid_input(format!("cannot load page {}: {e:?}", index + 1)))
    }
}

impl LoadedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, ReviewError> {
        let page = self.page(index)?;
        Ok(PageSize {
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
    }

    fn render(&self, index: usize, viewport: Viewport) -> Result<RgbaImage, ReviewError> {
        let page = self.page(index)?;
        let config = PdfRenderConfig::new()
            .set_target_size(viewport.width as i32, viewport.height as i32)
            .set_text_smoothing(true)
            .set_image_smoothing(true)
            .set_path_smoothing(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_failure(index, e))?;
        Ok(bitmap.as_image().into_rgba8())
    }
}
