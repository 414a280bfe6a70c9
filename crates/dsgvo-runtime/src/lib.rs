//! # dsgvo-runtime
//!
//! Model invocation and batch orchestration for DSGVO compliance checks.
//!
//! `dsgvo-core` builds prompts and parses replies without touching the
//! network. This crate adds the remote half:
//!
//! - [`LlmProvider`]: the seam to a chat-completion endpoint, with an
//!   OpenAI-compatible implementation behind the `openai` feature
//! - [`ModelInvoker`]: one call per prompt, failures folded into the four
//!   [`InvokeError`] kinds
//! - [`ComplianceChecker`]: runs a batch of documents, isolating failures
//!   per document and keeping input order
//! - [`CheckerConfig`]: explicit settings from defaults, file and environment
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsgvo_core::{DocumentInput, Language, Protocol};
//! use dsgvo_runtime::{CheckerConfig, ComplianceChecker, OpenAiProvider};
//! use std::sync::Arc;
//!
//! let config = CheckerConfig::load(None)?;
//! config.validate()?;
//! let checker = ComplianceChecker::builder()
//!     .provider(Arc::new(OpenAiProvider::from_config(&config)?))
//!     .config(&config)
//!     .build()?;
//!
//! let documents = vec![DocumentInput::new("policy.txt", text, Language::De)];
//! let reports = checker.check(&documents, &Protocol::default_gdpr()).await?;
//! ```

pub mod checker;
pub mod config;
pub mod invoker;
pub mod prompts;
pub mod providers;

pub use checker::{CheckError, ComplianceChecker, ComplianceCheckerBuilder};
pub use config::{CheckerConfig, ConfigError};
pub use invoker::ModelInvoker;
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, CredentialSource,
    InvokeError, LlmProvider, TokenUsage,
};

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;
