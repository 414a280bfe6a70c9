//! LLM provider abstractions for dsgvo-runtime.
//!
//! [`LlmProvider`] is the single seam through which the checker reaches a
//! model. The OpenAI-compatible HTTP implementation lives behind the
//! `openai` feature; tests substitute scripted in-memory providers.
//!
//! ## Security
//!
//! Providers hold their key as an [`ApiCredential`], which never prints its
//! value through `Debug` or `Display`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use dsgvo_core::FailureKind;

pub mod secrets;

#[cfg(feature = "openai")]
mod openai;

pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "openai")]
pub use openai::{OpenAiProvider, DEFAULT_BASE_URL};

/// Why a single model invocation failed.
///
/// Exactly four kinds; every transport-level problem is folded into one of
/// them so callers can decide on retries without inspecting messages.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl InvokeError {
    /// The core failure category for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            InvokeError::Auth(_) => FailureKind::Auth,
            InvokeError::RateLimited { .. } => FailureKind::RateLimit,
            InvokeError::Transport(_) => FailureKind::Transport,
            InvokeError::EmptyResponse => FailureKind::EmptyResponse,
        }
    }

    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Server-suggested wait before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            InvokeError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Per-request model settings. Defaults: `gpt-4`, 2000 tokens, 0.3, 60s.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Whole-request deadline; expiry is a transport failure
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 2000,
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One entry of the `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system` or `user`
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }
}

/// Text of the first choice plus bookkeeping for logs.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Model name as reported by the endpoint
    pub model: String,
    /// `finish_reason` of the first choice
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute one chat completion. No retries.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, InvokeError>;

    /// Check whether the endpoint answers with the configured credentials.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Endpoint description for logs, never containing credentials.
    fn endpoint(&self) -> String {
        self.name().to_string()
    }
}
