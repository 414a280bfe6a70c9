//! Caller-level retry policy.
//!
//! The checker makes exactly one call per document. When the user asks for
//! retries, the provider is wrapped so that retryable failures (rate limits,
//! transport errors) are re-attempted with exponential backoff before the
//! checker ever sees them.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;

use dsgvo_runtime::{ChatMessage, CompletionConfig, CompletionResponse, InvokeError, LlmProvider};

/// Provider decorator that retries retryable failures.
pub struct RetryProvider {
    inner: Arc<dyn LlmProvider>,
    backoff: ExponentialBuilder,
}

impl RetryProvider {
    /// Retry up to `retries` times, starting at one second between attempts.
    pub fn new(inner: Arc<dyn LlmProvider>, retries: usize) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30))
            .with_max_times(retries)
            .with_jitter();
        Self::with_backoff(inner, backoff)
    }

    /// Retry with an explicit backoff policy.
    pub fn with_backoff(inner: Arc<dyn LlmProvider>, backoff: ExponentialBuilder) -> Self {
        Self { inner, backoff }
    }
}

#[async_trait]
impl LlmProvider for RetryProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, InvokeError> {
        let inner = &self.inner;
        let attempt = || {
            let messages = messages.clone();
            async move { inner.complete(messages, config).await }
        };

        attempt
            .retry(self.backoff)
            .when(|error: &InvokeError| error.is_retryable())
            .notify(|error: &InvokeError, delay: Duration| {
                tracing::warn!(error = %error, delay = ?delay, "retrying model call");
            })
            .await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn endpoint(&self) -> String {
        self.inner.endpoint()
    }
}
