//! Capability interface to external services.
//!
//! The analysis pipeline never talks to a storage or AI service directly.
//! It receives a [`Capabilities`] bundle of trait objects and calls the
//! operations named here, so tests swap in fakes and the CLI swaps in
//! [`local::LocalStore`] plus [`crate::pipeline::llm::LlmScorer`].
//!
//! "No result" is modelled as `Ok(None)`, distinct from a transport
//! failure (`Err(BackendError)`); the orchestrator maps both to the same
//! step-specific error.

pub mod local;

use crate::error::{BackendError, ReviewError};
use crate::model::UploadedFile;
use crate::prompts::ScoringInstructions;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    /// Opaque storage path; only meaningful to the storage that issued it.
    pub path: String,
    pub name: String,
    pub size: u64,
}

/// One key-value entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvItem {
    pub key: String,
    /// `None` when listed without values.
    pub value: Option<String>,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, file: &UploadedFile) -> Result<Option<StoredBlob>, BackendError>;

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, BackendError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// List entries whose key matches `pattern` (`*` matches any run of
    /// characters), in store order.
    async fn list(&self, pattern: &str, include_values: bool) -> Result<Vec<KvItem>, BackendError>;
}

#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &ScoringInstructions,
    ) -> Result<Option<ScoringResponse>, BackendError>;
}

pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// The bundle of collaborators handed to the orchestrator and listing.
#[derive(Clone)]
pub struct Capabilities {
    pub storage: Arc<dyn BlobStorage>,
    pub kv: Arc<dyn KeyValueStore>,
    pub scoring: Arc<dyn ScoringService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Gate a view on authentication.
///
/// Returns the redirect target (`/auth?next=<next>`) as an error when no
/// session is present.
pub fn require_auth(auth: &dyn Authenticator, next: &str) -> Result<(), ReviewError> {
    if auth.is_authenticated() {
        Ok(())
    } else {
        Err(ReviewError::Unauthenticated {
            redirect: format!("/auth?next={next}"),
        })
    }
}

// ── Scoring response shape ───────────────────────────────────────────────

/// `{ message: { content: string | [{ text }] } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    pub message: ScoringMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringMessage {
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    pub text: String,
}

impl ScoringResponse {
    /// Response whose content is a plain string.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ScoringMessage {
                content: MessageContent::Text(content.into()),
            },
        }
    }

    /// The textual payload: the string itself, or the first part's text.
    pub fn content_text(&self) -> Option<&str> {
        match &self.message.content {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(parts) => parts.first().map(|p| p.text.as_str()),
        }
    }
}

/// Compile a `*` glob into an anchored regex. `*` matches any (possibly
/// empty) run of characters; everything else is literal.
pub fn pattern_regex(pattern: &str) -> Result<Regex, BackendError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^(?s){body}$"))
        .map_err(|e| BackendError::Other(format!("bad pattern '{pattern}': {e}")))
}
