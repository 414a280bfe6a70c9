//! Compliance checker: the per-document pipeline.
//!
//! For every document: build the prompt, invoke the model once, parse the
//! reply. A failed invocation becomes a degraded report for that document
//! only; the rest of the batch is unaffected and output order always
//! matches input order.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;

use dsgvo_core::{
    build_prompt, parse_document_response, ComplianceReport, DocumentInput, PromptConfig,
    Protocol, ProtocolError,
};

use crate::config::CheckerConfig;
use crate::invoker::ModelInvoker;
use crate::providers::{CompletionConfig, InvokeError, LlmProvider};

/// Errors from the checker.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),
}

/// Runs documents through prompt building, invocation and parsing.
///
/// Holds no per-run state; one instance can serve many runs.
#[derive(Debug, Clone)]
pub struct ComplianceChecker {
    invoker: ModelInvoker,
    prompt_config: PromptConfig,
    concurrency: usize,
}

impl ComplianceChecker {
    /// Create a checker with default prompt settings, one document at a time.
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            invoker: ModelInvoker::new(provider, completion),
            prompt_config: PromptConfig::default(),
            concurrency: 1,
        }
    }

    /// Start a builder.
    pub fn builder() -> ComplianceCheckerBuilder {
        ComplianceCheckerBuilder::new()
    }

    /// Documents analyzed at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Provider used for invocations.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        self.invoker.provider()
    }

    /// Analyze one document with a single model call.
    ///
    /// Unlike [`check`](Self::check), an invocation failure is returned as an
    /// error so the caller can decide whether to try again.
    pub async fn analyze(
        &self,
        document: &DocumentInput,
        protocol: &Protocol,
    ) -> Result<ComplianceReport, CheckError> {
        let prompt = build_prompt(
            &document.text,
            protocol,
            document.language,
            &self.prompt_config,
        )?;

        let reply = self.invoker.invoke(&prompt, document.language).await?;
        let report =
            parse_document_response(&document.filename, &reply, protocol, document.language);

        tracing::info!(
            filename = %document.filename,
            overall_score = report.overall_score,
            degraded = report.parse_degraded,
            "document analyzed"
        );
        Ok(report)
    }

    /// Check every document against `protocol`.
    ///
    /// Returns one report per document, in input order. Fails only when the
    /// protocol cannot be checked, and then before any remote call.
    pub async fn check(
        &self,
        documents: &[DocumentInput],
        protocol: &Protocol,
    ) -> Result<Vec<ComplianceReport>, CheckError> {
        protocol.ensure_checkable()?;

        tracing::debug!(
            documents = documents.len(),
            categories = protocol.len(),
            concurrency = self.concurrency,
            "starting check run"
        );

        stream::iter(documents)
            .map(|document| self.check_document(document, protocol))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Analyze one document, turning an invocation failure into its report.
    async fn check_document(
        &self,
        document: &DocumentInput,
        protocol: &Protocol,
    ) -> Result<ComplianceReport, CheckError> {
        match self.analyze(document, protocol).await {
            Err(CheckError::Invoke(error)) => {
                tracing::warn!(
                    filename = %document.filename,
                    kind = %error.kind(),
                    error = %error,
                    "analysis failed, reporting degraded result"
                );
                Ok(ComplianceReport::invocation_failed(
                    document.filename.clone(),
                    protocol,
                    document.language,
                    error.kind(),
                    &error.to_string(),
                ))
            }
            other => other,
        }
    }
}

/// Builder for [`ComplianceChecker`].
pub struct ComplianceCheckerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    completion: CompletionConfig,
    prompt_config: PromptConfig,
    concurrency: usize,
}

impl ComplianceCheckerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            provider: None,
            completion: CompletionConfig::default(),
            prompt_config: PromptConfig::default(),
            concurrency: 1,
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Take request, prompt and concurrency settings from `config`.
    pub fn config(mut self, config: &CheckerConfig) -> Self {
        self.completion = config.completion_config();
        self.prompt_config = config.prompt_config();
        self.concurrency = config.concurrency;
        self
    }

    /// Set how many documents are analyzed at once.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the prompt settings.
    pub fn prompt_config(mut self, prompt_config: PromptConfig) -> Self {
        self.prompt_config = prompt_config;
        self
    }

    /// Build the checker.
    pub fn build(self) -> Result<ComplianceChecker, CheckError> {
        let provider = self
            .provider
            .ok_or_else(|| CheckError::ProviderNotConfigured("No provider set".to_string()))?;

        Ok(ComplianceChecker {
            invoker: ModelInvoker::new(provider, self.completion),
            prompt_config: self.prompt_config,
            concurrency: self.concurrency.max(1),
        })
    }
}

impl Default for ComplianceCheckerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
