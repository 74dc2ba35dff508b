//! Error types for the skillsense library.
//!
//! Three error types reflect three different audiences:
//!
//! * [`ReviewError`] — **Fatal** for the current operation. Every step of the
//!   analysis sequence returns it, and the orchestrator propagates the first
//!   one unchanged. [`ReviewError::status_text`] renders it the way the user
//!   sees it (`Error: …`).
//!
//! * [`BackendError`] — raised by a collaborator (blob storage, key-value
//!   store, scoring service). The orchestrator never returns it directly; it
//!   folds it into the step-specific [`ReviewError`] variant so callers see
//!   *which* step failed rather than *how* the transport failed.
//!
//! * [`IntakeRejection`] — a file picked by the user was not accepted. The
//!   held file is left untouched; the rejection only carries the reason.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the skillsense library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file is not a PDF, or the document is empty or unreadable.
    #[error("Invalid file: {detail}")]
    InvalidInput { detail: String },

    /// The form was submitted before a file was selected.
    #[error("Please upload a PDF first.")]
    NoFileSelected,

    /// Input path does not exist.
    #[error("File not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// The computed viewport has a zero dimension.
    #[error("Invalid PDF page dimensions: {width}x{height} px")]
    InvalidGeometry { width: u32, height: u32 },

    /// The rendered surface could not be exported as PNG.
    #[error("Failed to create image from PDF: {detail}")]
    EncodingFailed { detail: String },

    /// The rendering engine could not be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory) to use an existing copy."
    )]
    EngineUnavailable(String),

    // ── Orchestration errors ──────────────────────────────────────────────
    /// Blob storage returned no result or failed.
    #[error("Failed to upload '{name}': {reason}")]
    UploadFailed { name: String, reason: String },

    /// The rasteriser returned a result that cannot be stored.
    #[error("Conversion returned an invalid file: {detail}")]
    ConversionFailed { detail: String },

    /// The scoring capability returned no result or failed.
    #[error("Failed to analyze resume: {reason}")]
    ScoringFailed { reason: String },

    /// The scoring response did not contain parseable feedback.
    #[error("Malformed scoring response: {detail}")]
    MalformedScoringResponse { detail: String },

    /// A key-value read or write failed.
    #[error("Failed to access record '{key}': {reason}")]
    StoreFailed { key: String, reason: String },

    /// No authenticated session; the caller should redirect.
    #[error("Not signed in. Continue at {redirect}")]
    Unauthenticated { redirect: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The LLM provider could not be created (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    /// User-facing status line, e.g. `Error: Please upload a PDF first.`
    pub fn status_text(&self) -> String {
        format!("Error: {self}")
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        ReviewError::InvalidInput {
            detail: detail.into(),
        }
    }
}

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The LLM provider rejected or failed the request.
    #[error("provider error: {0}")]
    Provider(String),

    /// Any other collaborator-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Why a picked file was not accepted by [`crate::intake::FileIntake`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeRejection {
    #[error("'{name}' is not a PDF (type '{mime_type}')")]
    NotPdf { name: String, mime_type: String },

    #[error("'{name}' is {size} bytes; the limit is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
}
