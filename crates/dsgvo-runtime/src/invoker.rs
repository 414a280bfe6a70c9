//! One remote model call per prompt.

use std::sync::Arc;
use std::time::Instant;

use dsgvo_core::Language;

use crate::prompts::system_prompt;
use crate::providers::{ChatMessage, CompletionConfig, InvokeError, LlmProvider};

/// Sends a built prompt to the model and returns the raw reply text.
///
/// Exactly one attempt per call. Retrying is the caller's decision, made on
/// [`InvokeError::is_retryable`].
#[derive(Clone)]
pub struct ModelInvoker {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl ModelInvoker {
    /// Create an invoker for `provider` with fixed request settings.
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }

    /// Request settings in use.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Provider behind this invoker.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Send `prompt` and return the reply text, which is never blank.
    pub async fn invoke(&self, prompt: &str, language: Language) -> Result<String, InvokeError> {
        let messages = vec![
            ChatMessage::system(system_prompt(language)),
            ChatMessage::user(prompt),
        ];

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "invoking model"
        );

        let started = Instant::now();
        let response = self.provider.complete(messages, &self.config).await?;

        if response.content.trim().is_empty() {
            return Err(InvokeError::EmptyResponse);
        }

        tracing::info!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            total_tokens = response.usage.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            stop_reason = ?response.stop_reason,
            "model replied"
        );

        Ok(response.content)
    }
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}
