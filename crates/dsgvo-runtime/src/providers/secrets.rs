//! Credential handling for the model endpoint.
//!
//! The API key is wrapped in a [`SecretString`] as soon as it is read, so it
//! cannot end up in `Debug`/`Display` output, log fields or error messages.
//! Call [`ApiCredential::expose`] only where the header is set.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Origin of the API key, reported by `ping` and in debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `api_key` in the config file
    Config,
    /// `OPENAI_API_KEY` (including `.env`)
    Environment,
    /// Passed in by library code
    Programmatic,
}

impl CredentialSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Environment => "environment",
            Self::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const REDACTED: &str = "[REDACTED]";

/// The endpoint API key. Never printed.
pub struct ApiCredential {
    key: SecretString,
    origin: CredentialSource,
}

impl ApiCredential {
    pub fn new(key: impl Into<String>, origin: CredentialSource) -> Self {
        let key: String = key.into();
        Self {
            key: key.into(),
            origin,
        }
    }

    /// Read a key from an environment variable; blank values count as unset.
    pub fn from_env(env_var: &str) -> Option<Self> {
        Self::from_lookup(env_var, |name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        env_var: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        match lookup(env_var) {
            Some(key) if !key.trim().is_empty() => {
                Some(Self::new(key, CredentialSource::Environment))
            }
            _ => None,
        }
    }

    /// The raw key, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        self.key.expose_secret()
    }

    /// True for an empty or whitespace-only key.
    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.origin
    }
}

impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.origin)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiCredential({REDACTED}, from {})", self.origin)
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REDACTED} ({})", self.origin)
    }
}
