//! System prompts sent ahead of every analysis request.
//!
//! The user message is the prompt built by `dsgvo_core::build_prompt`; the
//! system message only fixes the model's role and output discipline.

use dsgvo_core::Language;

/// System prompt in German.
pub const SYSTEM_PROMPT_DE: &str = "Du bist ein Experte für DSGVO-Compliance. \
Analysiere das bereitgestellte Dokument anhand der vorgegebenen Prüfkriterien und liefere \
eine detaillierte Bewertung mit Punktzahlen, Problemen und Empfehlungen. \
Antworte ausschließlich im verlangten JSON-Format.";

/// System prompt in English.
pub const SYSTEM_PROMPT_EN: &str = "You are a GDPR compliance expert. \
Analyze the provided document against the given compliance criteria and provide a \
detailed assessment with scores, issues, and recommendations. \
Reply only in the requested JSON format.";

/// System prompt for the report language.
pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::De => SYSTEM_PROMPT_DE,
        Language::En => SYSTEM_PROMPT_EN,
    }
}
