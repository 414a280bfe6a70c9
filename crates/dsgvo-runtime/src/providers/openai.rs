//! OpenAI-compatible chat completion provider.
//!
//! Talks to `POST {base_url}/chat/completions` with bearer authentication.
//! The base URL defaults to the public OpenAI API; any proxy that speaks the
//! same protocol can be configured instead.
//!
//! ## Error mapping
//!
//! | Outcome | Error |
//! |---------|-------|
//! | 401, 403 | [`InvokeError::Auth`] |
//! | 429 | [`InvokeError::RateLimited`] with `retry-after` seconds if sent |
//! | other non-2xx, connect/DNS/timeout, undecodable body | [`InvokeError::Transport`] |
//! | no choices, null or blank content | [`InvokeError::EmptyResponse`] |

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{CheckerConfig, ConfigError};

use super::{
    secrets::ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, InvokeError,
    LlmProvider, TokenUsage,
};

/// Public OpenAI endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest slice of an error body carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    credential: ApiCredential,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider for the public OpenAI endpoint.
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Provider for the key and endpoint in `config`.
    pub fn from_config(config: &CheckerConfig) -> Result<Self, ConfigError> {
        let credential = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let provider = Self::new(credential);
        Ok(match &config.base_url {
            Some(url) => provider.with_base_url(url.as_str()),
            None => provider,
        })
    }

    /// Use a proxy or self-hosted endpoint instead.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when a non-default endpoint is configured.
    pub fn is_proxy(&self) -> bool {
        self.base_url != DEFAULT_BASE_URL
    }
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

/// Chat completion response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Map a non-success HTTP status to an invocation error.
pub(crate) fn classify_status(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> InvokeError {
    match status {
        401 | 403 => InvokeError::Auth(format!("HTTP {}: {}", status, error_message(body))),
        429 => InvokeError::RateLimited { retry_after },
        _ => InvokeError::Transport(format!("HTTP {}: {}", status, error_message(body))),
    }
}

/// The endpoint's own error message, or a bounded prefix of the raw body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error.message;
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> InvokeError {
    if error.is_timeout() {
        InvokeError::Transport(format!("request timed out after {:?}", timeout))
    } else {
        InvokeError::Transport(error.to_string())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, InvokeError> {
        let request = ChatRequest {
            model: &config.model,
            messages: &messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body, retry_after));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| InvokeError::Transport(format!("undecodable response body: {}", e)))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(InvokeError::EmptyResponse);
        };
        let content = match choice.message.content {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Err(InvokeError::EmptyResponse),
        };

        Ok(CompletionResponse {
            content,
            usage,
            model: parsed.model.unwrap_or_else(|| config.model.clone()),
            stop_reason: choice.finish_reason,
        })
    }

    async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "health check rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}
