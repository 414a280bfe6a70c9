//! Input types and failure categories shared by the core and the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language::Language;

/// Extracted text of one uploaded document.
///
/// File type and size checks happen upstream; by the time a document reaches
/// the checker its text is taken as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Original file name, carried into the report
    pub filename: String,

    /// Extracted plain text
    pub text: String,

    /// Language the report should be written in
    #[serde(default)]
    pub language: Language,
}

impl DocumentInput {
    /// Create a document input.
    pub fn new(filename: impl Into<String>, text: impl Into<String>, language: Language) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            language,
        }
    }
}

/// Why a remote analysis call produced no reply to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials rejected by the endpoint
    Auth,
    /// Quota or rate limit signalled by the endpoint
    RateLimit,
    /// Connection, DNS, timeout or unusable HTTP response
    Transport,
    /// Call succeeded but the reply was blank
    EmptyResponse,
}

impl FailureKind {
    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::RateLimit | FailureKind::Transport)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Auth => write!(f, "auth"),
            FailureKind::RateLimit => write!(f, "rate_limit"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::EmptyResponse => write!(f, "empty_response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_language_defaults_to_german() {
        let doc: DocumentInput =
            serde_json::from_str(r#"{"filename": "a.txt", "text": "hello"}"#).unwrap();
        assert_eq!(doc.language, Language::De);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::RateLimit.is_retryable());
        assert!(FailureKind::Transport.is_retryable());
        assert!(!FailureKind::Auth.is_retryable());
        assert!(!FailureKind::EmptyResponse.is_retryable());
    }
}
