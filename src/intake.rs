//! File Intake: hold at most one validated PDF picked by the user.
//!
//! A selection is accepted only if it declares `application/pdf` and fits
//! under the size ceiling. Rejected selections leave the held file exactly
//! as it was and come back as an [`IntakeRejection`] so the caller can tell
//! the user why.

use crate::config::DEFAULT_MAX_FILE_BYTES;
use crate::error::IntakeRejection;
use crate::model::UploadedFile;
use std::sync::Arc;
use tracing::{debug, warn};

/// Notified whenever the held file changes or a selection is rejected.
///
/// Both methods default to no-ops.
pub trait IntakeObserver: Send + Sync {
    fn on_file_changed(&self, file: Option<&UploadedFile>) {
        let _ = file;
    }

    fn on_rejected(&self, rejection: &IntakeRejection) {
        let _ = rejection;
    }
}

pub struct FileIntake {
    max_bytes: u64,
    held: Option<UploadedFile>,
    observer: Option<Arc<dyn IntakeObserver>>,
}

impl Default for FileIntake {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl FileIntake {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            held: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IntakeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.held.as_ref()
    }

    /// Take the held file, leaving the intake empty (no notification).
    pub fn take(&mut self) -> Option<UploadedFile> {
        self.held.take()
    }

    /// Handle a pick/drop. Only the first file is considered.
    pub fn select(&mut self, files: impl IntoIterator<Item = UploadedFile>) -> Result<(), IntakeRejection> {
        let Some(file) = files.into_iter().next() else {
            return Ok(());
        };

        if let Err(rejection) = self.check(&file) {
            warn!("Rejected {}: {}", file.name(), rejection);
            if let Some(obs) = &self.observer {
                obs.on_rejected(&rejection);
            }
            return Err(rejection);
        }

        debug!("Accepted {} ({})", file.name(), format_size(file.size()));
        self.held = Some(file);
        self.notify();
        Ok(())
    }

    /// Clear the held file.
    pub fn remove(&mut self) {
        self.held = None;
        self.notify();
    }

    fn check(&self, file: &UploadedFile) -> Result<(), IntakeRejection> {
        if !file.is_pdf() {
            return Err(IntakeRejection::NotPdf {
                name: file.name().to_string(),
                mime_type: file.mime_type().to_string(),
            });
        }
        if file.size() > self.max_bytes {
            return Err(IntakeRejection::TooLarge {
                name: file.name().to_string(),
                size: file.size(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    fn notify(&self) {
        if let Some(obs) = &self.observer {
            obs.on_file_changed(self.held.as_ref());
        }
    }
}

/// Human-readable size: `0 KB`, `12.50 KB`, `1.20 MB`, `2.00 GB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes == 0 {
        return "0 KB".to_string();
    }
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else {
        format!("{:.2} KB", b / KB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<Option<String>>>,
        rejections: Mutex<Vec<IntakeRejection>>,
    }

    impl IntakeObserver for Recorder {
        fn on_file_changed(&self, file: Option<&UploadedFile>) {
            self.changes
                .lock()
                .unwrap()
                .push(file.map(|f| f.name().to_string()));
        }

        fn on_rejected(&self, rejection: &IntakeRejection) {
            self.rejections.lock().unwrap().push(rejection.clone());
        }
    }

    fn pdf(name: &str, size: usize) -> UploadedFile {
        UploadedFile::pdf(name, vec![0u8; size])
    }

    #[test]
    fn accepts_pdf_and_notifies() {
        let rec = Arc::new(Recorder::default());
        let mut intake = FileIntake::new(100).with_observer(rec.clone());

        intake.select([pdf("a.pdf", 10)]).unwrap();
        assert_eq!(intake.file().unwrap().name(), "a.pdf");
        assert_eq!(*rec.changes.lock().unwrap(), vec![Some("a.pdf".to_string())]);
    }

    #[test]
    fn new_selection_replaces_held_file() {
        let mut intake = FileIntake::new(100);
        intake.select([pdf("a.pdf", 10)]).unwrap();
        intake.select([pdf("b.pdf", 10), pdf("c.pdf", 10)]).unwrap();
        assert_eq!(intake.file().unwrap().name(), "b.pdf");
    }

    #[test]
    fn non_pdf_leaves_state_unchanged() {
        let rec = Arc::new(Recorder::default());
        let mut intake = FileIntake::new(100).with_observer(rec.clone());
        intake.select([pdf("a.pdf", 10)]).unwrap();

        let err = intake
            .select([UploadedFile::new("a.docx", "application/msword", vec![0u8; 5])])
            .unwrap_err();
        assert!(matches!(err, IntakeRejection::NotPdf { .. }));
        assert_eq!(intake.file().unwrap().name(), "a.pdf");
        assert_eq!(rec.changes.lock().unwrap().len(), 1);
        assert_eq!(rec.rejections.lock().unwrap().len(), 1);
    }

    #[test]
    fn oversized_leaves_state_unchanged() {
        let mut intake = FileIntake::new(100);
        let err = intake.select([pdf("big.pdf", 101)]).unwrap_err();
        assert_eq!(
            err,
            IntakeRejection::TooLarge {
                name: "big.pdf".into(),
                size: 101,
                max: 100
            }
        );
        assert!(intake.file().is_none());

        // Exactly at the ceiling is fine.
        intake.select([pdf("edge.pdf", 100)]).unwrap();
        assert!(intake.file().is_some());
    }

    #[test]
    fn default_ceiling_is_twenty_mib() {
        let mut intake = FileIntake::default();
        assert!(intake.select([pdf("big.pdf", 20 * 1024 * 1024 + 1)]).is_err());
    }

    #[test]
    fn empty_selection_is_noop() {
        let rec = Arc::new(Recorder::default());
        let mut intake = FileIntake::new(100).with_observer(rec.clone());
        intake.select(Vec::new()).unwrap();
        assert!(rec.changes.lock().unwrap().is_empty());
    }

    #[test]
    fn remove_clears_and_notifies() {
        let rec = Arc::new(Recorder::default());
        let mut intake = FileIntake::new(100).with_observer(rec.clone());
        intake.select([pdf("a.pdf", 1)]).unwrap();
        intake.remove();
        assert!(intake.file().is_none());
        assert_eq!(
            *rec.changes.lock().unwrap(),
            vec![Some("a.pdf".to_string()), None]
        );
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 KB");
        assert_eq!(format_size(512), "0.50 KB");
        assert_eq!(format_size(1536 * 1024), "1.50 MB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.00 GB");
    }
}
