//! # skillsense
//!
//! Résumé review: rasterise a PDF résumé, store it, and record AI feedback
//! scored against a target job.
//!
//! ## Workflow
//!
//! ```text
//! PDF (picked / path / URL)
//!  │
//!  ├─ 1. Intake    one file, PDF only, size-capped
//!  ├─ 2. Upload    original PDF → blob storage
//!  ├─ 3. Render    page 1 → PNG at 4× (pdfium, spawn_blocking)
//!  ├─ 4. Upload    PNG → blob storage
//!  ├─ 5. Record    resume:<uuid> written with empty feedback
//!  ├─ 6. Score     vision model rates the résumé for the job
//!  └─ 7. Record    same key rewritten with the parsed feedback
//! ```
//!
//! Every external service sits behind a trait in [`backend`]. The crate
//! ships a directory-backed store ([`backend::local::LocalStore`]) and an
//! LLM scorer ([`pipeline::llm::LlmScorer`]); hosts may bring their own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skillsense::backend::local::LocalStore;
//! use skillsense::pipeline::llm::{resolve_provider, LlmScorer};
//! use skillsense::{AnalysisForm, Capabilities, Rasterizer, ResumeAnalyzer, ReviewConfig, UploadedFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReviewConfig::default();
//!     let store = Arc::new(LocalStore::new(&config.store_dir));
//!     store.sign_in("me").await?;
//!
//!     let rasterizer = Arc::new(Rasterizer::pdfium(&config));
//!     let scorer = LlmScorer::new(resolve_provider(&config)?, store.clone(), rasterizer.clone(), config.clone());
//!     let caps = Capabilities {
//!         storage: store.clone(),
//!         kv: store.clone(),
//!         scoring: Arc::new(scorer),
//!         auth: store,
//!     };
//!
//!     let file = UploadedFile::pdf("resume.pdf", std::fs::read("resume.pdf")?);
//!     let form = AnalysisForm {
//!         company_name: "Acme".into(),
//!         job_title: "Backend Engineer".into(),
//!         job_description: "Rust, Postgres, on-call".into(),
//!     };
//!     let outcome = ResumeAnalyzer::new(caps, rasterizer, &config).submit(Some(file), form).await?;
//!     println!("{}", outcome.route);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `skillsense` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod backend;
pub mod config;
pub mod error;
pub mod intake;
pub mod listing;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{extract_feedback, AnalysisForm, AnalysisOutcome, AnalysisRequest, ResumeAnalyzer};
pub use backend::{
    require_auth, Authenticator, BlobStorage, Capabilities, KeyValueStore, KvItem, ScoringResponse,
    ScoringService, StoredBlob,
};
pub use config::{ResponseFormat, ReviewConfig, ReviewConfigBuilder};
pub use error::{BackendError, IntakeRejection, ReviewError};
pub use intake::{format_size, FileIntake, IntakeObserver};
pub use listing::{list_records, load_record, render_listing, render_record};
pub use model::{ConversionResult, UploadedFile};
pub use pipeline::engine::{DocumentEngine, EngineCell, EngineLoader, LoadedDocument, PageSize, Viewport};
pub use pipeline::render::{PageRasterizer, Rasterizer};
pub use progress::{AnalysisObserver, AnalysisStage, NoopObserver};
pub use prompts::ScoringInstructions;
pub use record::{Category, Feedback, FeedbackState, ResumeRecord, Tip, TipKind};
