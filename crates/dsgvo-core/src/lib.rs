//! # dsgvo-core
//!
//! Deterministic half of the DSGVO compliance check.
//!
//! This crate turns extracted document text plus a criteria protocol into a
//! prompt, and turns a language model's free-form reply back into a
//! structured, scored [`ComplianceReport`]. It never talks to the network:
//! invoking the model is the job of `dsgvo-runtime`.
//!
//! ## Key Guarantees
//!
//! 1. **Pure**: [`build_prompt`] and [`parse_response`] depend only on their inputs
//! 2. **Total parsing**: any reply, including garbage, yields a renderable report
//! 3. **Reconciled**: a report has exactly one category result per protocol
//!    category, in protocol order
//! 4. **Flagged**: every defaulted field marks the whole report as degraded
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsgvo_core::{build_prompt, parse_response, Language, PromptConfig, Protocol};
//!
//! let protocol = Protocol::default_gdpr();
//! let prompt = build_prompt("Wir speichern Ihre E-Mail-Adresse ...", &protocol,
//!     Language::De, &PromptConfig::default())?;
//!
//! // ... send `prompt` to the model ...
//!
//! let (report, degraded) = parse_response(&reply, &protocol, Language::De);
//! if degraded {
//!     println!("best-effort report, treat scores with care");
//! }
//! ```

pub mod language;
pub mod parser;
pub mod prompt;
pub mod protocol;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use language::Language;
pub use parser::{extract_json_block, parse_document_response, parse_response};
pub use prompt::{build_prompt, truncate_content, PromptConfig};
pub use protocol::{Category, Protocol, ProtocolError};
pub use report::{CategoryResult, ComplianceBand, ComplianceReport, RunSummary};
pub use types::{DocumentInput, FailureKind};
