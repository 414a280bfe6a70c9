//! Response parsing: model reply text to [`ComplianceReport`].
//!
//! The model is asked for one JSON object but may wrap it in prose or code
//! fences, omit fields, use wrong types or invent categories. Parsing is total:
//! every input yields a complete report, and any field that had to be
//! defaulted marks the whole report as degraded.
//!
//! # Steps
//! 1. Extract the first well-formed JSON object from the reply
//! 2. Validate each field, tagging it valid or defaulted
//! 3. Reconcile categories against the protocol (protocol order, exact keys)
//! 4. Clamp scores into [0, 100]
//! 5. Use the supplied overall score or the rounded mean of category scores

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

use crate::language::Language;
use crate::protocol::Protocol;
use crate::report::{CategoryResult, ComplianceReport};

/// A field value together with whether it came from the reply or a default.
#[derive(Debug, Clone, PartialEq)]
enum Checked<T> {
    Valid(T),
    Defaulted(T),
}

impl<T> Checked<T> {
    /// Unwrap the value, recording a defaulted field in `degraded`.
    fn resolve(self, degraded: &mut bool) -> T {
        match self {
            Checked::Valid(value) => value,
            Checked::Defaulted(value) => {
                *degraded = true;
                value
            }
        }
    }
}

/// Clamp a score into [0, 100].
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Locate the first well-formed top-level JSON object in `raw`.
///
/// Walks outermost balanced brace pairs (ignoring braces inside JSON
/// strings) left to right. A balanced block that is not valid JSON is
/// skipped as a whole; objects nested inside it are never returned.
pub fn extract_json_block(raw: &str) -> Option<JsonValue> {
    let bytes = raw.as_bytes();
    let mut cursor = 0;

    while let Some(offset) = raw[cursor..].find('{') {
        let start = cursor + offset;
        // An unclosed brace encloses everything after it
        let end = matching_brace(bytes, start)?;
        if let Ok(value @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(&raw[start..=end])
        {
            return Some(value);
        }
        cursor = end + 1;
    }

    None
}

/// Byte index of the brace closing the one at `start`.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a model reply into a report without a filename.
///
/// Returns the report and whether it is degraded (same as
/// `report.parse_degraded`). Never fails.
pub fn parse_response(
    raw_text: &str,
    protocol: &Protocol,
    language: Language,
) -> (ComplianceReport, bool) {
    let report = parse_document_response("", raw_text, protocol, language);
    let degraded = report.parse_degraded;
    (report, degraded)
}

/// Parse a model reply into the report for `filename`. Never fails.
pub fn parse_document_response(
    filename: &str,
    raw_text: &str,
    protocol: &Protocol,
    language: Language,
) -> ComplianceReport {
    let Some(JsonValue::Object(data)) = extract_json_block(raw_text) else {
        tracing::warn!(
            filename,
            reply_len = raw_text.len(),
            "no JSON object in model reply"
        );
        return ComplianceReport::unparseable(filename, protocol, language);
    };

    let mut degraded = false;

    let summary = check_summary(data.get("summary"), language).resolve(&mut degraded);
    let supplied_overall = check_overall(data.get("overall_score")).resolve(&mut degraded);

    let (entries, malformed) = index_category_entries(data.get("category_results"));
    degraded |= malformed;

    let category_results: Vec<CategoryResult> = protocol
        .categories()
        .iter()
        .map(|category| {
            if !category.is_applicable() {
                return CategoryResult::not_applicable(category.key.clone());
            }
            match entries.get(category.key.as_str()) {
                Some(entry) => category_from_entry(&category.key, entry).resolve(&mut degraded),
                None => {
                    degraded = true;
                    CategoryResult::zeroed(category.key.clone(), language.missing_category_issue())
                }
            }
        })
        .collect();

    let dropped = entries
        .keys()
        .filter(|key| protocol.category(key).is_none())
        .count();
    if dropped > 0 {
        tracing::debug!(filename, dropped, "discarded categories unknown to the protocol");
    }

    let overall_score = supplied_overall.unwrap_or_else(|| mean_score(&category_results));

    if degraded {
        tracing::warn!(filename, "model reply incomplete, report degraded");
    }

    ComplianceReport {
        filename: filename.to_string(),
        overall_score,
        category_results,
        summary,
        parse_degraded: degraded,
        failure: None,
    }
}

/// Index `category_results` entries by key; the first entry for a key wins.
///
/// The flag is set when the field is missing or holds something other than
/// a list of objects with a string `category_key`.
fn index_category_entries(value: Option<&JsonValue>) -> (HashMap<&str, &Map<String, JsonValue>>, bool) {
    let mut entries = HashMap::new();

    let Some(JsonValue::Array(items)) = value else {
        return (entries, true);
    };

    let mut malformed = false;
    for item in items {
        let keyed = item
            .as_object()
            .and_then(|obj| obj.get("category_key")?.as_str().map(|key| (key, obj)));
        match keyed {
            Some((key, obj)) => {
                entries.entry(key).or_insert(obj);
            }
            None => malformed = true,
        }
    }

    (entries, malformed)
}

fn category_from_entry(key: &str, entry: &Map<String, JsonValue>) -> Checked<CategoryResult> {
    let mut degraded = false;

    let result = CategoryResult {
        category_key: key.to_string(),
        score: check_score(entry.get("score")).resolve(&mut degraded),
        issues: check_string_list(entry.get("issues")).resolve(&mut degraded),
        recommendations: check_string_list(entry.get("recommendations")).resolve(&mut degraded),
        not_applicable: false,
    };

    if degraded {
        Checked::Defaulted(result)
    } else {
        Checked::Valid(result)
    }
}

fn check_score(value: Option<&JsonValue>) -> Checked<f64> {
    match value.and_then(JsonValue::as_f64) {
        Some(score) => Checked::Valid(clamp_score(score)),
        None => Checked::Defaulted(0.0),
    }
}

/// A missing or null overall score is not a defect; it is computed instead.
fn check_overall(value: Option<&JsonValue>) -> Checked<Option<f64>> {
    match value {
        None | Some(JsonValue::Null) => Checked::Valid(None),
        Some(v) => match v.as_f64() {
            Some(score) => Checked::Valid(Some(clamp_score(score))),
            None => Checked::Defaulted(None),
        },
    }
}

fn check_string_list(value: Option<&JsonValue>) -> Checked<Vec<String>> {
    let Some(JsonValue::Array(items)) = value else {
        return Checked::Defaulted(Vec::new());
    };

    let strings: Vec<String> = items
        .iter()
        .filter_map(JsonValue::as_str)
        .map(str::to_string)
        .collect();

    if strings.len() == items.len() {
        Checked::Valid(strings)
    } else {
        Checked::Defaulted(strings)
    }
}

fn check_summary(value: Option<&JsonValue>, language: Language) -> Checked<String> {
    match value.and_then(JsonValue::as_str) {
        Some(summary) => Checked::Valid(summary.to_string()),
        None => Checked::Defaulted(language.fallback_summary().to_string()),
    }
}

/// Rounded mean of the assessed categories; 0 when none were assessed.
fn mean_score(results: &[CategoryResult]) -> f64 {
    let scores: Vec<f64> = results
        .iter()
        .filter(|r| !r.not_applicable)
        .map(|r| r.score)
        .collect();

    if scores.is_empty() {
        return 0.0;
    }
    (scores.iter().sum::<f64>() / scores.len() as f64).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Category;
    use proptest::prelude::*;
    use serde_json::json;

    fn protocol() -> Protocol {
        Protocol::new(vec![
            Category::new("legal_basis", "Legal basis", vec!["c1".into()]),
            Category::new("security", "Security", vec!["c2".into()]),
            Category::new("retention", "Retention", vec!["c3".into()]),
            Category::new("breaches", "Breaches", vec!["c4".into()]),
        ])
        .unwrap()
    }

    fn entry(key: &str, score: JsonValue) -> JsonValue {
        json!({
            "category_key": key,
            "score": score,
            "issues": ["issue"],
            "recommendations": ["recommendation"]
        })
    }

    fn well_formed_reply() -> JsonValue {
        json!({
            "overall_score": 71,
            "summary": "Mostly fine",
            "category_results": [
                entry("legal_basis", json!(80)),
                entry("security", json!(60.5)),
                entry("retention", json!(100)),
                entry("breaches", json!(0)),
            ]
        })
    }

    // ==================== EXTRACTION ====================

    #[test]
    fn test_extract_from_prose_and_fences() {
        let raw = "Here is my analysis:\n```json\n{\"summary\": \"ok\"}\n```\nThanks!";
        assert_eq!(extract_json_block(raw), Some(json!({"summary": "ok"})));
    }

    #[test]
    fn test_extract_picks_outermost_object() {
        let raw = r#"{"a": {"b": 1}, "c": 2}"#;
        assert_eq!(extract_json_block(raw), Some(json!({"a": {"b": 1}, "c": 2})));
    }

    #[test]
    fn test_extract_ignores_braces_inside_strings() {
        let raw = r#"prefix {"summary": "use } and { freely", "x": "\"}"} suffix"#;
        let value = extract_json_block(raw).unwrap();
        assert_eq!(value["summary"], "use } and { freely");
    }

    #[test]
    fn test_extract_skips_malformed_leading_block() {
        let raw = r#"{not json} then {"summary": "real"}"#;
        assert_eq!(extract_json_block(raw), Some(json!({"summary": "real"})));
    }

    #[test]
    fn test_extract_does_not_descend_into_malformed_object() {
        let raw = r#"{"summary": "ok", "category_results": [{"category_key": "a", "score": 80},]}"#;
        assert_eq!(extract_json_block(raw), None);

        let raw = format!("{raw}\n{{\"summary\": \"second\"}}");
        assert_eq!(extract_json_block(&raw), Some(json!({"summary": "second"})));
    }

    #[test]
    fn test_extract_none_without_object() {
        assert_eq!(extract_json_block(""), None);
        assert_eq!(extract_json_block("no data here"), None);
        assert_eq!(extract_json_block("{ unterminated"), None);
        assert_eq!(extract_json_block("[1, 2, 3]"), None);
    }

    // ==================== PARSING ====================

    #[test]
    fn test_well_formed_reply_is_not_degraded() {
        let (report, degraded) =
            parse_response(&well_formed_reply().to_string(), &protocol(), Language::En);

        assert!(!degraded);
        assert_eq!(report.overall_score, 71.0);
        assert_eq!(report.summary, "Mostly fine");
        let keys: Vec<&str> = report
            .category_results
            .iter()
            .map(|c| c.category_key.as_str())
            .collect();
        assert_eq!(keys, vec!["legal_basis", "security", "retention", "breaches"]);
        assert_eq!(report.category_results[1].score, 60.5);
    }

    #[test]
    fn test_results_follow_protocol_order_not_reply_order() {
        let reply = json!({
            "summary": "s",
            "category_results": [
                entry("breaches", json!(10)),
                entry("retention", json!(20)),
                entry("security", json!(30)),
                entry("legal_basis", json!(40)),
            ]
        });
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);
        assert!(!degraded);
        let scores: Vec<f64> = report.category_results.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![40.0, 30.0, 20.0, 10.0]);
    }

    #[test]
    fn test_empty_reply_fully_degraded() {
        let (report, degraded) = parse_response("", &protocol(), Language::En);

        assert!(degraded);
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.category_results.len(), 4);
        for result in &report.category_results {
            assert_eq!(result.score, 0.0);
            assert_eq!(result.issues, vec!["could not parse model response"]);
        }
        assert_eq!(report.summary, Language::En.fallback_summary());
    }

    #[test]
    fn test_trailing_comma_reply_is_unparseable_not_missing() {
        let raw = r#"Result:
{"summary": "ok", "category_results": [
  {"category_key": "legal_basis", "score": 80, "issues": [], "recommendations": []},
]}"#;
        let (report, degraded) = parse_response(raw, &protocol(), Language::En);

        assert!(degraded);
        assert_eq!(report.summary, Language::En.fallback_summary());
        for result in &report.category_results {
            assert_eq!(result.score, 0.0);
            assert_eq!(result.issues, vec!["could not parse model response"]);
        }
    }

    #[test]
    fn test_overall_score_computed_from_categories() {
        let reply = json!({
            "summary": "s",
            "category_results": [
                entry("legal_basis", json!(80)),
                entry("security", json!(60)),
                entry("retention", json!(100)),
                entry("breaches", json!(0)),
            ]
        });
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);
        assert!(!degraded);
        assert_eq!(report.overall_score, 60.0);
    }

    #[test]
    fn test_computed_overall_is_rounded() {
        let reply = json!({
            "summary": "s",
            "category_results": [
                entry("legal_basis", json!(80)),
                entry("security", json!(61)),
                entry("retention", json!(100)),
                entry("breaches", json!(0)),
            ]
        });
        let (report, _) = parse_response(&reply.to_string(), &protocol(), Language::En);
        // 241 / 4 = 60.25
        assert_eq!(report.overall_score, 60.0);
    }

    #[test]
    fn test_scores_are_clamped() {
        let reply = json!({
            "overall_score": 250,
            "summary": "s",
            "category_results": [
                entry("legal_basis", json!(-5)),
                entry("security", json!(150)),
                entry("retention", json!(100)),
                entry("breaches", json!(0)),
            ]
        });
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);
        assert!(!degraded);
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.category_results[0].score, 0.0);
        assert_eq!(report.category_results[1].score, 100.0);
    }

    #[test]
    fn test_non_numeric_score_defaults_and_degrades() {
        let mut reply = well_formed_reply();
        reply["category_results"][0]["score"] = json!("eighty");
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(degraded);
        assert_eq!(report.category_results[0].score, 0.0);
        // Other fields of the same entry are kept
        assert_eq!(report.category_results[0].issues, vec!["issue"]);
    }

    #[test]
    fn test_non_numeric_overall_falls_back_to_mean() {
        let mut reply = well_formed_reply();
        reply["overall_score"] = json!("high");
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(degraded);
        // round((80 + 60.5 + 100 + 0) / 4) = round(60.125)
        assert_eq!(report.overall_score, 60.0);
    }

    #[test]
    fn test_missing_summary_uses_fallback() {
        let mut reply = well_formed_reply();
        reply.as_object_mut().unwrap().remove("summary");
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::De);

        assert!(degraded);
        assert_eq!(report.summary, Language::De.fallback_summary());
    }

    #[test]
    fn test_wrong_typed_lists_default_to_empty() {
        let mut reply = well_formed_reply();
        reply["category_results"][1]["issues"] = json!("just one string");
        reply["category_results"][2]["recommendations"] = json!(["keep", 42, "this"]);
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(degraded);
        assert!(report.category_results[1].issues.is_empty());
        assert_eq!(report.category_results[2].recommendations, vec!["keep", "this"]);
    }

    #[test]
    fn test_missing_category_synthesized() {
        let mut reply = well_formed_reply();
        reply["category_results"].as_array_mut().unwrap().remove(2);
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(degraded);
        assert_eq!(report.category_results.len(), 4);
        let retention = &report.category_results[2];
        assert_eq!(retention.category_key, "retention");
        assert_eq!(retention.score, 0.0);
        assert_eq!(retention.issues, vec!["category missing from model response"]);
    }

    #[test]
    fn test_unknown_category_dropped_silently() {
        let mut reply = well_formed_reply();
        reply["category_results"]
            .as_array_mut()
            .unwrap()
            .push(entry("hallucinated", json!(99)));
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(!degraded);
        assert!(report
            .category_results
            .iter()
            .all(|c| c.category_key != "hallucinated"));
    }

    #[test]
    fn test_duplicate_category_first_wins() {
        let mut reply = well_formed_reply();
        reply["category_results"]
            .as_array_mut()
            .unwrap()
            .push(entry("legal_basis", json!(5)));
        let (report, _) = parse_response(&reply.to_string(), &protocol(), Language::En);
        assert_eq!(report.category_results[0].score, 80.0);
    }

    #[test]
    fn test_malformed_entry_degrades() {
        let mut reply = well_formed_reply();
        reply["category_results"]
            .as_array_mut()
            .unwrap()
            .push(json!("not an object"));
        let (_, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);
        assert!(degraded);
    }

    #[test]
    fn test_category_results_wrong_type_degrades_every_category() {
        let reply = json!({ "summary": "s", "category_results": { "legal_basis": {} } });
        let (report, degraded) = parse_response(&reply.to_string(), &protocol(), Language::En);

        assert!(degraded);
        assert!(report
            .category_results
            .iter()
            .all(|c| c.issues == vec!["category missing from model response"]));
    }

    #[test]
    fn test_not_applicable_category_ignores_model_data() {
        let protocol = Protocol::new(vec![
            Category::new("a", "A", vec!["c".into()]),
            Category::new("video", "Video", vec![]),
        ])
        .unwrap();
        let reply = json!({
            "summary": "s",
            "category_results": [entry("a", json!(50)), entry("video", json!(0))]
        });
        let (report, degraded) = parse_response(&reply.to_string(), &protocol, Language::En);

        assert!(!degraded);
        assert!(report.category_results[1].not_applicable);
        // Mean excludes the not-applicable category
        assert_eq!(report.overall_score, 50.0);
    }

    #[test]
    fn test_unparseable_reply_keeps_not_applicable_category() {
        let protocol = Protocol::new(vec![
            Category::new("a", "A", vec!["c".into()]),
            Category::new("video", "Video", vec![]),
        ])
        .unwrap();
        let (report, degraded) = parse_response("", &protocol, Language::En);

        assert!(degraded);
        assert_eq!(report.category_results[0].issues, vec!["could not parse model response"]);
        assert!(report.category_results[1].not_applicable);
        assert!(report.category_results[1].issues.is_empty());
    }

    #[test]
    fn test_filename_is_carried() {
        let report = parse_document_response(
            "policy.txt",
            &well_formed_reply().to_string(),
            &protocol(),
            Language::En,
        );
        assert_eq!(report.filename, "policy.txt");
    }

    // ==================== PROPERTIES ====================

    proptest! {
        #[test]
        fn prop_scores_clamped_to_nearest_bound(score in -1.0e6f64..1.0e6) {
            let mut reply = well_formed_reply();
            reply["category_results"][0]["score"] = json!(score);
            let (report, _) = parse_response(&reply.to_string(), &protocol(), Language::En);

            let stored = report.category_results[0].score;
            prop_assert!((0.0..=100.0).contains(&stored));
            if score < 0.0 {
                prop_assert_eq!(stored, 0.0);
            } else if score > 100.0 {
                prop_assert_eq!(stored, 100.0);
            }
        }

        #[test]
        fn prop_any_reply_yields_one_result_per_category(raw in ".*") {
            let protocol = protocol();
            let (report, _) = parse_response(&raw, &protocol, Language::En);

            let keys: Vec<&str> = report.category_results.iter().map(|c| c.category_key.as_str()).collect();
            let expected: Vec<&str> = protocol.categories().iter().map(|c| c.key.as_str()).collect();
            prop_assert_eq!(keys, expected);
            prop_assert!((0.0..=100.0).contains(&report.overall_score));
        }

        #[test]
        fn prop_unknown_keys_never_reported(key in "[a-z]{1,12}") {
            let protocol = protocol();
            prop_assume!(protocol.category(&key).is_none());

            let mut reply = well_formed_reply();
            reply["category_results"].as_array_mut().unwrap().push(entry(&key, json!(42)));
            let (report, _) = parse_response(&reply.to_string(), &protocol, Language::En);

            prop_assert!(report.category_results.iter().all(|c| c.category_key != key));
        }

        #[test]
        fn prop_parse_is_idempotent(raw in ".*", wrap in any::<bool>()) {
            let raw = if wrap {
                format!("Analysis:\n{}\n{}", well_formed_reply(), raw)
            } else {
                raw
            };
            let protocol = protocol();
            let first = parse_response(&raw, &protocol, Language::De);
            let second = parse_response(&raw, &protocol, Language::De);

            prop_assert_eq!(
                serde_json::to_string(&first.0).unwrap(),
                serde_json::to_string(&second.0).unwrap()
            );
            prop_assert_eq!(first.1, second.1);
        }
    }
}
