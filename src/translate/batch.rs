//! Batch translation with bounded retries and source-text fallback.

use super::prompt::{build_prompt, Prompt};
use super::reply::{decode_reply, DecodedReply};
use super::retry::RetryPolicy;
use super::{truncate, BatchItem, BatchOutcome, LanguageModel, TranslationContext, Translator};
use crate::error::SubtransError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a single request to the model.
#[derive(Debug)]
enum Attempt {
    Success(DecodedReply),
    /// Worth repeating: rate limiting, network trouble, unusable reply.
    Retryable(SubtransError),
    /// Repeating cannot help, e.g. rejected credentials.
    Terminal(SubtransError),
}

/// [`Translator`] backed by a [`LanguageModel`].
pub struct BatchTranslator {
    model: Arc<dyn LanguageModel>,
    policy: RetryPolicy,
}

impl BatchTranslator {
    pub fn new(model: Box<dyn LanguageModel>) -> Self {
        Self {
            model: Arc::from(model),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, prompt: &Prompt, sources: &[&str]) -> Attempt {
        let raw = match self.model.complete(prompt).await {
            Ok(raw) => raw,
            Err(e) if e.is_retryable() => return Attempt::Retryable(e),
            Err(e) => return Attempt::Terminal(e),
        };

        match decode_reply(&raw, sources) {
            Ok(decoded) => Attempt::Success(decoded),
            Err(e) => {
                debug!("Unusable reply: {}", truncate(&raw, 200));
                Attempt::Retryable(e)
            }
        }
    }
}

#[async_trait]
impl Translator for BatchTranslator {
    async fn translate(&self, items: &[BatchItem], context: &TranslationContext<'_>) -> BatchOutcome {
        if items.is_empty() {
            return BatchOutcome::translated(
                DecodedReply {
                    texts: Vec::new(),
                    substituted: 0,
                },
                0,
            );
        }

        let prompt = match build_prompt(items, context) {
            Ok(prompt) => prompt,
            Err(e) => return BatchOutcome::fallback(items, e.to_string(), 0),
        };
        let sources: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();

        debug!(
            "Translating {} item(s) to {} with {}",
            items.len(),
            context.target_language,
            self.model.model()
        );

        let mut last_error = None;
        let mut attempts = 0;

        while attempts < self.policy.max_attempts.max(1) {
            attempts += 1;

            match self.attempt(&prompt, &sources).await {
                Attempt::Success(decoded) => {
                    if decoded.substituted > 0 {
                        warn!(
                            "{} of {} item(s) missing from reply, kept source text",
                            decoded.substituted,
                            items.len()
                        );
                    }
                    return BatchOutcome::translated(decoded, attempts);
                }
                Attempt::Terminal(e) => {
                    warn!("Attempt {} failed permanently: {}", attempts, e);
                    return BatchOutcome::fallback(items, e.to_string(), attempts);
                }
                Attempt::Retryable(e) => {
                    warn!("Attempt {} failed: {}", attempts, e);
                    if self.policy.allows_retry_after(attempts) {
                        let delay = self.policy.delay_for(&e);
                        debug!("Retrying in {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        warn!(
            "Giving up after {} attempt(s), keeping {} source line(s): {}",
            attempts,
            items.len(),
            reason
        );
        BatchOutcome::fallback(items, reason, attempts)
    }

    fn name(&self) -> &str {
        self.model.name()
    }
}
