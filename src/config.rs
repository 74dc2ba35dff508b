//! Configuration types for résumé analysis.
//!
//! All behaviour is controlled through [`ReviewConfig`], built via its
//! [`ReviewConfigBuilder`]. Collaborators (storage, scoring) are injected
//! separately through [`crate::backend::Capabilities`]; this struct only
//! carries knobs.

use crate::error::ReviewError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest file File Intake accepts: 20 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// Oversampling factor applied to the page's native size.
pub const DEFAULT_RENDER_SCALE: f32 = 4.0;

/// Key prefix for stored records.
pub const DEFAULT_KEY_PREFIX: &str = "resume:";

/// Configuration for résumé analysis.
///
/// # Example
/// ```rust
/// use skillsense::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .key_prefix("cv:")
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.render_scale, 4.0);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Scale applied to page 1 when rasterising. Range: 0.5–8. Default: 4.0.
    ///
    /// A US-Letter page (612×792 pt) becomes a 2448×3168 px PNG at the
    /// default.
    pub render_scale: f32,

    /// Largest accepted upload in bytes. Default: 20 MiB.
    pub max_file_bytes: u64,

    /// Prefix for record keys in the key-value store. Default: `resume:`.
    pub key_prefix: String,

    /// Response format requested from the scoring service. Default: JSON.
    pub response_format: ResponseFormat,

    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for scoring. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate for one review. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a failed scoring call. Default: 0.
    ///
    /// The analysis sequence itself never retries; this only applies inside
    /// the LLM scorer.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt for the scorer. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Root directory of the local backend. Default: `./.skillsense`.
    pub store_dir: PathBuf,

    /// Explicit libpdfium file or directory. Falls back to `PDFIUM_LIB_PATH`.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            response_format: ResponseFormat::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            system_prompt: None,
            store_dir: PathBuf::from(".skillsense"),
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("render_scale", &self.render_scale)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("key_prefix", &self.key_prefix)
            .field("response_format", &self.response_format)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("store_dir", &self.store_dir)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if !(0.5..=8.0).contains(&c.render_scale) {
            return Err(ReviewError::InvalidConfig(format!(
                "render scale must be 0.5–8, got {}",
                c.render_scale
            )));
        }
        if c.max_file_bytes == 0 {
            return Err(ReviewError::InvalidConfig(
                "max file size must be > 0".into(),
            ));
        }
        if c.key_prefix.is_empty() || c.key_prefix.contains('*') {
            return Err(ReviewError::InvalidConfig(format!(
                "key prefix must be non-empty and contain no '*', got {:?}",
                c.key_prefix
            )));
        }
        Ok(self.config)
    }
}

/// Response format tag embedded in scoring instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
        }
    }
}
