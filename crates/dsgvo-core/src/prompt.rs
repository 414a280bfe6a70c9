//! Prompt construction for compliance analysis.
//!
//! The prompt is a pure function of document text, protocol, language and
//! [`PromptConfig`]. Identical inputs always produce byte-identical prompts.

use serde_json::json;

use crate::language::Language;
use crate::protocol::{Protocol, ProtocolError};

/// Default maximum document length embedded in a prompt, in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 8000;

/// Settings that shape the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Maximum number of document characters embedded in the prompt
    pub max_content_length: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Fixed prompt wording per language.
struct PromptText {
    intro: &'static str,
    document_heading: &'static str,
    criteria_heading: &'static str,
    format_instruction: &'static str,
    guidelines_heading: &'static str,
    guidelines: &'static [&'static str],
    summary_placeholder: &'static str,
    issue_placeholder: &'static str,
    recommendation_placeholder: &'static str,
}

const PROMPT_DE: PromptText = PromptText {
    intro: "Analysiere das folgende Dokument auf DSGVO-Konformität anhand der angegebenen Prüfkriterien.",
    document_heading: "DOKUMENTINHALT",
    criteria_heading: "PRÜFKRITERIEN",
    format_instruction: "Antworte ausschließlich mit genau einem JSON-Objekt ohne weiteren Text. Verwende exakt diese Feldnamen und diese Struktur:",
    guidelines_heading: "Richtlinien",
    guidelines: &[
        "Bewerte jede Kategorie mit einer Zahl von 0 bis 100 nach Grad der Konformität",
        "Verwende als category_key exakt den Schlüssel in eckigen Klammern",
        "Nenne konkrete Probleme mit Bezug auf den Dokumentinhalt",
        "Gib umsetzbare Empfehlungen zur Verbesserung",
        "Berücksichtige ausdrückliche und implizite Anforderungen",
    ],
    summary_placeholder: "Kurze Gesamtbewertung",
    issue_placeholder: "Gefundenes Problem",
    recommendation_placeholder: "Konkrete Empfehlung",
};

const PROMPT_EN: PromptText = PromptText {
    intro: "Analyze the following document for GDPR compliance based on the provided criteria.",
    document_heading: "DOCUMENT CONTENT",
    criteria_heading: "COMPLIANCE CRITERIA",
    format_instruction: "Reply with exactly one JSON object and no other text. Use exactly these field names and this structure:",
    guidelines_heading: "Guidelines",
    guidelines: &[
        "Score each category from 0 to 100 based on compliance level",
        "Use the key in square brackets verbatim as category_key",
        "Identify specific issues and reference the document content",
        "Provide actionable recommendations for improvement",
        "Consider both explicit mentions and implicit compliance requirements",
    ],
    summary_placeholder: "Brief overall assessment",
    issue_placeholder: "Issue found",
    recommendation_placeholder: "Actionable recommendation",
};

fn prompt_text(language: Language) -> &'static PromptText {
    match language {
        Language::De => &PROMPT_DE,
        Language::En => &PROMPT_EN,
    }
}

/// Cut `text` to at most `max_chars` characters, keeping the prefix.
///
/// Returns the text unchanged (borrowed) when it already fits.
pub fn truncate_content(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_chars)
        .map(|(byte_offset, _)| &text[..byte_offset])
}

/// Build the analysis prompt for one document.
///
/// Fails with [`ProtocolError::InvalidProtocol`] when the protocol has no
/// categories. Empty document text still yields a complete prompt.
pub fn build_prompt(
    document_text: &str,
    protocol: &Protocol,
    language: Language,
    config: &PromptConfig,
) -> Result<String, ProtocolError> {
    protocol.ensure_checkable()?;
    let text = prompt_text(language);

    let mut prompt = String::with_capacity(document_text.len().min(config.max_content_length) + 4096);

    prompt.push_str(text.intro);
    prompt.push_str("\n\n");

    prompt.push_str(text.document_heading);
    prompt.push_str(":\n\"\"\"\n");
    match truncate_content(document_text, config.max_content_length) {
        Some(prefix) => {
            tracing::debug!(
                max_chars = config.max_content_length,
                "document text truncated for prompt"
            );
            prompt.push_str(prefix);
            prompt.push('\n');
            prompt.push_str(language.truncation_marker());
        }
        None => prompt.push_str(document_text),
    }
    prompt.push_str("\n\"\"\"\n\n");

    prompt.push_str(text.criteria_heading);
    prompt.push_str(":\n");
    for category in protocol.categories() {
        prompt.push_str(&format!("\n[{}] {}", category.key, category.title));
        if !category.is_applicable() {
            prompt.push_str(&format!(" ({})\n", language.not_applicable_label()));
            continue;
        }
        prompt.push('\n');
        if let Some(description) = &category.description {
            prompt.push_str(description);
            prompt.push('\n');
        }
        for criterion in &category.criteria {
            prompt.push_str("- ");
            prompt.push_str(criterion);
            prompt.push('\n');
        }
    }

    prompt.push('\n');
    prompt.push_str(text.format_instruction);
    prompt.push('\n');
    prompt.push_str(&response_skeleton(protocol, text));
    prompt.push_str("\n\n");

    prompt.push_str(text.guidelines_heading);
    prompt.push_str(":\n");
    for line in text.guidelines {
        prompt.push_str("- ");
        prompt.push_str(line);
        prompt.push('\n');
    }
    prompt.push_str(&format!("- Language / Sprache: {}\n", language.prompt_name()));

    Ok(prompt)
}

/// Literal reply template with the protocol's own category keys.
fn response_skeleton(protocol: &Protocol, text: &PromptText) -> String {
    let categories: Vec<serde_json::Value> = protocol
        .categories()
        .iter()
        .filter(|c| c.is_applicable())
        .map(|c| {
            json!({
                "category_key": c.key,
                "score": 0,
                "issues": [text.issue_placeholder],
                "recommendations": [text.recommendation_placeholder],
            })
        })
        .collect();

    let skeleton = json!({
        "overall_score": 0,
        "summary": text.summary_placeholder,
        "category_results": categories,
    });

    // Serializing a `Value` cannot fail; fall back to compact form regardless.
    serde_json::to_string_pretty(&skeleton).unwrap_or_else(|_| skeleton.to_string())
}
