//! Report language and the fixed, localized strings used in prompts and
//! synthesized report content.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::FailureKind;

/// Language the model is asked to answer in and that fallback texts use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// German (default, the protocol ships in German)
    #[default]
    De,
    /// English
    En,
}

impl Language {
    /// Resolve a language code. Never fails: unknown codes fall back to
    /// [`Language::De`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "eng" | "english" | "englisch" => Language::En,
            "de" | "deu" | "ger" | "german" | "deutsch" => Language::De,
            other => {
                tracing::debug!(code = other, "unknown language code, using default");
                Language::default()
            }
        }
    }

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
        }
    }

    /// Language name as written into the prompt instruction.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::De => "Deutsch",
            Language::En => "English",
        }
    }

    /// Issue attached to every category when the reply had no usable data block.
    pub fn parse_failure_issue(&self) -> &'static str {
        match self {
            Language::De => "Modellantwort konnte nicht ausgewertet werden",
            Language::En => "could not parse model response",
        }
    }

    /// Summary used whenever the reply did not provide one.
    pub fn fallback_summary(&self) -> &'static str {
        match self {
            Language::De => {
                "Die Analyse ist unvollständig; das Dokument sollte manuell geprüft werden."
            }
            Language::En => "The analysis is incomplete; review the document manually.",
        }
    }

    /// Issue for a protocol category the model did not report on.
    pub fn missing_category_issue(&self) -> &'static str {
        match self {
            Language::De => "Kategorie fehlt in der Modellantwort",
            Language::En => "category missing from model response",
        }
    }

    /// Issue naming why the remote analysis call failed.
    pub fn failure_issue(&self, kind: FailureKind) -> &'static str {
        match (self, kind) {
            (Language::De, FailureKind::Auth) => {
                "Analyse fehlgeschlagen: Authentifizierung abgelehnt"
            }
            (Language::De, FailureKind::RateLimit) => {
                "Analyse fehlgeschlagen: Anfragelimit überschritten"
            }
            (Language::De, FailureKind::Transport) => {
                "Analyse fehlgeschlagen: Verbindung zum Modell gestört"
            }
            (Language::De, FailureKind::EmptyResponse) => {
                "Analyse fehlgeschlagen: leere Modellantwort"
            }
            (Language::En, FailureKind::Auth) => "analysis failed: authentication rejected",
            (Language::En, FailureKind::RateLimit) => "analysis failed: rate limit exceeded",
            (Language::En, FailureKind::Transport) => "analysis failed: connection error",
            (Language::En, FailureKind::EmptyResponse) => "analysis failed: empty model response",
        }
    }

    /// Summary for a report whose remote call failed.
    pub fn failure_summary(&self) -> &'static str {
        match self {
            Language::De => "Die Analyse konnte nicht durchgeführt werden.",
            Language::En => "The analysis could not be performed.",
        }
    }

    /// Marker appended when document text was cut to the configured length.
    pub fn truncation_marker(&self) -> &'static str {
        match self {
            Language::De => "[Inhalt aus Längengründen gekürzt]",
            Language::En => "[Content truncated due to length]",
        }
    }

    /// Label for a category that has no criteria configured.
    pub fn not_applicable_label(&self) -> &'static str {
        match self {
            Language::De => "nicht anwendbar: keine Kriterien hinterlegt",
            Language::En => "not applicable: no criteria configured",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_code(s))
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}
