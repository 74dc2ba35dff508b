//! Observer trait for analysis status updates.
//!
//! The orchestrator reports each step as an [`AnalysisStage`] before running
//! it, then either the completion route or the error status line. Hosts map
//! these to whatever they display: the CLI drives a spinner, a web host would
//! update a status banner.
//!
//! # Example
//!
//! ```rust
//! use skillsense::{AnalysisObserver, AnalysisStage};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Log(Mutex<Vec<String>>);
//!
//! impl AnalysisObserver for Log {
//!     fn on_stage(&self, stage: AnalysisStage) {
//!         self.0.lock().unwrap().push(stage.status_text().to_string());
//!     }
//! }
//!
//! let log = Log::default();
//! log.on_stage(AnalysisStage::Converting);
//! assert_eq!(log.0.lock().unwrap()[0], "Converting PDF to image...");
//! ```

use std::fmt;
use std::sync::Arc;

/// One step of the analysis sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStage {
    UploadingFile,
    Converting,
    UploadingImage,
    Preparing,
    Analyzing,
    Complete,
}

impl AnalysisStage {
    /// The status line shown to the user while this stage runs.
    pub fn status_text(self) -> &'static str {
        match self {
            AnalysisStage::UploadingFile => "Uploading the file...",
            AnalysisStage::Converting => "Converting PDF to image...",
            AnalysisStage::UploadingImage => "Uploading the image...",
            AnalysisStage::Preparing => "Preparing data...",
            AnalysisStage::Analyzing => "Analyzing...",
            AnalysisStage::Complete => "Analysis complete, redirecting...",
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Receives status updates from [`crate::analyze::ResumeAnalyzer`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Independent submissions may share one observer, so
/// implementations must be `Send + Sync`.
pub trait AnalysisObserver: Send + Sync {
    /// Called before each step starts.
    fn on_stage(&self, stage: AnalysisStage) {
        let _ = stage;
    }

    /// Called once the record is complete.
    ///
    /// # Arguments
    /// * `route` — where to navigate next, e.g. `/resume/<id>`
    fn on_complete(&self, route: &str) {
        let _ = route;
    }

    /// Called when a step fails. `status` is the full `Error: …` line.
    fn on_error(&self, status: &str) {
        let _ = status;
    }
}

/// Observer that ignores every event. Used when none is configured.
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Convenience alias for the type held by the analyzer.
pub type SharedObserver = Arc<dyn AnalysisObserver>;
