//! Input resolution: turn a CLI argument (path or URL) into an [`UploadedFile`].
//!
//! The declared MIME type is what [`crate::intake::FileIntake`] checks, so it
//! is inferred the way a browser would: from the `Content-Type` header for
//! downloads, from the extension for local files, and from the `%PDF`
//! magic as a last resort.

use crate::error::ReviewError;
use crate::model::{UploadedFile, PDF_MIME};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const OCTET_STREAM: &str = "application/octet-stream";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to an in-memory file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedFile, ReviewError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<UploadedFile, ReviewError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReviewError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => ReviewError::invalid_input(format!("cannot read '{}': {e}", path.display())),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".to_string());
    let mime = infer_mime(&name, None, &bytes);

    debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), mime);
    Ok(UploadedFile::new(name, mime, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, ReviewError> {
    info!("Downloading resume from: {}", url);

    let failed = |reason: String| ReviewError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());
    let name = file_name_from_url(url);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    let mime = infer_mime(&name, content_type.as_deref(), &bytes);

    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), mime);
    Ok(UploadedFile::new(name, mime, bytes.to_vec()))
}

/// Header first, then extension, then magic bytes.
fn infer_mime(name: &str, content_type: Option<&str>, bytes: &[u8]) -> String {
    match content_type {
        Some(ct) if !ct.is_empty() && ct != OCTET_STREAM => return ct.to_string(),
        _ => {}
    }
    let has_pdf_ext = PathBuf::from(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf_ext || bytes.starts_with(b"%PDF") {
        PDF_MIME.to_string()
    } else {
        OCTET_STREAM.to_string()
    }
}

/// Last non-empty path segment containing a dot, else `resume.pdf`.
fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "resume.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn mime_prefers_header() {
        assert_eq!(infer_mime("cv.pdf", Some("text/html"), b"%PDF"), "text/html");
        assert_eq!(infer_mime("cv", Some(OCTET_STREAM), b"%PDF-1.7"), PDF_MIME);
    }

    #[test]
    fn mime_from_extension_or_magic() {
        assert_eq!(infer_mime("CV.PDF", None, b""), PDF_MIME);
        assert_eq!(infer_mime("scan", None, b"%PDF-1.4"), PDF_MIME);
        assert_eq!(infer_mime("notes.txt", None, b"hello"), OCTET_STREAM);
    }

    #[test]
    fn url_file_names() {
        assert_eq!(file_name_from_url("https://x.io/files/cv.pdf?dl=1"), "cv.pdf");
        assert_eq!(file_name_from_url("https://x.io/files/"), "resume.pdf");
    }

    #[tokio::test]
    async fn local_file_is_read_with_inferred_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.7 test").unwrap();

        let file = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(file.name(), "resume.pdf");
        assert!(file.is_pdf());
        assert_eq!(file.size(), 13);
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ReviewError::InputNotFound { .. }));
    }
}
