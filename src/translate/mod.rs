pub mod batch;
pub mod context;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod reply;
pub mod retry;

pub use batch::BatchTranslator;
pub use context::RollingContext;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompt::{build_prompt, Prompt};
pub use reply::{DecodedReply, Reply};
pub use retry::RetryPolicy;

use crate::config::{Config, Provider};
use crate::error::{Result, SubtransError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// One cue's dialogue as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub text: String,
    pub max_chars: usize,
}

impl BatchItem {
    pub fn new(text: impl Into<String>, max_chars: usize) -> Self {
        Self {
            text: text.into(),
            max_chars,
        }
    }
}

/// Everything besides the items that shapes a translation request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationContext<'a> {
    /// Title of the film or show, for the model's benefit only.
    pub title: &'a str,
    pub target_language: &'a str,
    /// Static tone and character notes, identical for every batch of a run.
    pub style_guide: Option<&'a str>,
    /// Tail of the previous batch's output.
    pub rolling_context: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    /// The model replied with usable JSON.
    Translated,
    /// Every item kept its source text.
    Fallback { reason: String },
}

/// Result of translating one batch. `texts` always has one entry per input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub texts: Vec<String>,
    pub status: BatchStatus,
    pub attempts: u32,
    /// Items that came back missing or blank and were replaced by their source.
    pub substituted: usize,
}

impl BatchOutcome {
    pub fn translated(reply: DecodedReply, attempts: u32) -> Self {
        Self {
            texts: reply.texts,
            status: BatchStatus::Translated,
            attempts,
            substituted: reply.substituted,
        }
    }

    pub fn fallback(items: &[BatchItem], reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            texts: items.iter().map(|item| item.text.clone()).collect(),
            status: BatchStatus::Fallback {
                reason: reason.into(),
            },
            attempts,
            substituted: 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.status, BatchStatus::Fallback { .. })
    }
}

/// Translates an ordered batch of subtitle lines.
///
/// Implementations never fail: whatever happens remotely, the outcome holds
/// exactly one string per item, in input order.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, items: &[BatchItem], context: &TranslationContext<'_>) -> BatchOutcome;
    fn name(&self) -> &str;
}

/// A chat-style language model reachable over HTTP.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the raw reply text.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
    /// Cheap request that fails when the key or endpoint is unusable.
    async fn check_connection(&self) -> Result<()>;
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
}

/// Default per-request timeout for model calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the language model for a provider from persisted configuration.
pub fn create_model(provider: Provider, config: &Config) -> Result<Box<dyn LanguageModel>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    match provider {
        Provider::OpenAi => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                SubtransError::Config(
                    "OpenAI API key not set. Set OPENAI_API_KEY environment variable.".to_string(),
                )
            })?;
            let mut client = OpenAiClient::new(api_key).with_timeout(timeout);
            if let Some(ref model) = config.model {
                client = client.with_model(model.clone());
            }
            Ok(Box::new(client))
        }
        Provider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                SubtransError::Config(
                    "Gemini API key not set. Set GEMINI_API_KEY environment variable.".to_string(),
                )
            })?;
            let mut client = GeminiClient::new(api_key).with_timeout(timeout);
            if let Some(ref model) = config.model {
                client = client.with_model(model.clone());
            }
            Ok(Box::new(client))
        }
    }
}

/// Map a non-success HTTP status to the error class the retry policy acts on.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> SubtransError {
    let detail = format!("{} API error ({}): {}", provider, status, truncate(body, 300));
    match status {
        StatusCode::TOO_MANY_REQUESTS => SubtransError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SubtransError::Auth(detail),
        _ => SubtransError::Api(detail),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
