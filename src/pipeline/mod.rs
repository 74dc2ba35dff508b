//! Document stages: getting a résumé in, turning it into an image, scoring it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm
//! (URL/path) (pdfium)  (PNG/b64)  (VLM)
//!              ▲
//!           engine (shared, initialised once)
//! ```
//!
//! 1. [`input`]  — read a local path or download a URL into an `UploadedFile`
//! 2. [`engine`] — engine traits, viewport maths and the once-only engine cell
//! 3. [`render`] — page 1 → RGBA surface, on the blocking pool
//! 4. [`encode`] — PNG bytes, preview data URL, VLM attachment
//! 5. [`llm`]    — the `ScoringService` backed by a vision model

pub mod encode;
pub mod engine;
pub mod input;
pub mod llm;
pub mod render;
