//! VLM-backed scoring service.
//!
//! [`LlmScorer`] implements [`ScoringService`] on top of any
//! `edgequake_llm` provider. Given the storage path of the original PDF it
//! reads the bytes back, rasterises page 1 with the shared rasteriser, and
//! sends the page image together with the rendered instructions. The raw
//! completion text is returned as a string-content [`ScoringResponse`];
//! parsing is the orchestrator's job.
//!
//! ## Retry Strategy
//!
//! Off by default (`max_retries = 0`). When enabled, waits
//! `retry_backoff_ms * 2^(attempt - 1)` before each retry, saturating.

use super::encode;
use super::render::PageRasterizer;
use crate::backend::{BlobStorage, ScoringResponse, ScoringService};
use crate::config::ReviewConfig;
use crate::error::{BackendError, ReviewError};
use crate::model::UploadedFile;
use crate::prompts::{ScoringInstructions, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

pub struct LlmScorer {
    provider: Arc<dyn LLMProvider>,
    storage: Arc<dyn BlobStorage>,
    rasterizer: Arc<dyn PageRasterizer>,
    config: ReviewConfig,
}

impl LlmScorer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        storage: Arc<dyn BlobStorage>,
        rasterizer: Arc<dyn PageRasterizer>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            provider,
            storage,
            rasterizer,
            config,
        }
    }
}

#[async_trait]
impl ScoringService for LlmScorer {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &ScoringInstructions,
    ) -> Result<Option<ScoringResponse>, BackendError> {
        let Some(bytes) = self.storage.read(document_path).await? else {
            warn!("Document {} not found in storage", document_path);
            return Ok(None);
        };

        let name = document_path.rsplit('/').next().unwrap_or(document_path);
        let page = self
            .rasterizer
            .rasterize(&UploadedFile::pdf(name, bytes))
            .await
            .map_err(|e| BackendError::Other(format!("cannot render {document_path}: {e}")))?;

        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let messages = build_messages(
            system_prompt,
            instructions,
            encode::to_image_data(page.file.bytes()),
        );
        let options = build_options(&self.config);

        let start = Instant::now();
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "Scoring retry {}/{} after {}ms",
                    attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    info!(
                        "Scored {} in {:?} ({} in / {} out tokens)",
                        document_path,
                        start.elapsed(),
                        response.prompt_tokens,
                        response.completion_tokens
                    );
                    debug!("Scoring response: {} chars", response.content.len());
                    return Ok(Some(ScoringResponse::text(response.content)));
                }
                Err(e) => {
                    let msg = e.to_string();
                    warn!("Scoring attempt {} failed: {}", attempt + 1, msg);
                    last_err = Some(msg);
                }
            }
        }

        Err(BackendError::Provider(
            last_err.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

/// System prompt, then the instructions with the page image attached.
fn build_messages(
    system_prompt: &str,
    instructions: &ScoringInstructions,
    image: ImageData,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(instructions.to_prompt(), vec![image]),
    ]
}

fn build_options(config: &ReviewConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider` — used as-is
/// 2. `config.provider_name` (+ `config.model`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. `OPENAI_API_KEY` present → OpenAI
/// 5. `ProviderFactory::from_env` auto-detection
pub fn resolve_provider(config: &ReviewConfig) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReviewError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        ReviewError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Delay before retry `attempt` (1-based); saturates instead of overflowing.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResponseFormat;

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
        assert_eq!(backoff_ms(500, 65), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
        assert_eq!(backoff_ms(0, 100), 0);
    }

    #[test]
    fn build_options_defaults() {
        let config = ReviewConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn messages_are_system_then_user() {
        let instructions = ScoringInstructions::new("Engineer", "Build things", ResponseFormat::Json);
        let msgs = build_messages(
            DEFAULT_SYSTEM_PROMPT,
            &instructions,
            encode::to_image_data(b"png"),
        );
        assert_eq!(msgs.len(), 2);
    }
}
