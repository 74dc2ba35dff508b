//! In-memory file types passed between intake, rasterisation and storage.

use std::fmt;
use std::sync::Arc;

pub const PDF_MIME: &str = "application/pdf";
pub const PNG_MIME: &str = "image/png";

/// An immutable named byte blob with a declared MIME type.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Shorthand for a file declared as `application/pdf`.
    pub fn pdf(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(name, PDF_MIME, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }
}

// Byte contents are omitted; a résumé PDF dumped into a log is never useful.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Output of rasterising page 1 of a PDF.
///
/// `image_url` is a `data:` URL suitable for immediate preview; it owns its
/// payload and is released when the result is dropped. `file` holds the
/// same PNG as an uploadable file.
#[derive(Clone)]
pub struct ConversionResult {
    pub image_url: String,
    pub file: UploadedFile,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionResult")
            .field("file", &self.file)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
