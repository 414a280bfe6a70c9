//! Compliance reports and run-level statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::protocol::Protocol;
use crate::types::FailureKind;

/// Result for one protocol category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    /// Key of the protocol category this result belongs to
    pub category_key: String,

    /// Compliance score, always within [0, 100]
    pub score: f64,

    /// Problems found in the document
    pub issues: Vec<String>,

    /// Suggested remediations
    pub recommendations: Vec<String>,

    /// Category has no criteria and was not assessed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_applicable: bool,
}

impl CategoryResult {
    /// A zero-score result carrying a single issue.
    pub fn zeroed(category_key: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            category_key: category_key.into(),
            score: 0.0,
            issues: vec![issue.into()],
            recommendations: Vec::new(),
            not_applicable: false,
        }
    }

    /// Result for a category that has no criteria.
    pub fn not_applicable(category_key: impl Into<String>) -> Self {
        Self {
            category_key: category_key.into(),
            score: 0.0,
            issues: Vec::new(),
            recommendations: Vec::new(),
            not_applicable: true,
        }
    }
}

/// Scored compliance report for one document.
///
/// Always structurally complete: one [`CategoryResult`] per protocol
/// category, in protocol order. `parse_degraded` tells renderers that some
/// of the content is a reconstruction and should be flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Source document name
    pub filename: String,

    /// Overall score, always within [0, 100]
    pub overall_score: f64,

    /// Per-category results in protocol order
    pub category_results: Vec<CategoryResult>,

    /// Short overall assessment
    pub summary: String,

    /// One or more fields were defaulted
    pub parse_degraded: bool,

    /// Set when the remote call failed and no reply was parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ComplianceReport {
    /// Report for a reply that contained no usable data at all.
    pub fn unparseable(filename: impl Into<String>, protocol: &Protocol, language: Language) -> Self {
        Self::zeroed(
            filename,
            protocol,
            language.parse_failure_issue(),
            language.fallback_summary(),
            None,
        )
    }

    /// Report for a document whose remote analysis call failed.
    ///
    /// A non-blank `detail` (the error message) is appended to the summary.
    pub fn invocation_failed(
        filename: impl Into<String>,
        protocol: &Protocol,
        language: Language,
        kind: FailureKind,
        detail: &str,
    ) -> Self {
        let detail = detail.trim();
        let summary = if detail.is_empty() {
            language.failure_summary().to_string()
        } else {
            format!("{} ({})", language.failure_summary(), detail)
        };
        Self::zeroed(
            filename,
            protocol,
            language.failure_issue(kind),
            summary,
            Some(kind),
        )
    }

    fn zeroed(
        filename: impl Into<String>,
        protocol: &Protocol,
        issue: &str,
        summary: impl Into<String>,
        failure: Option<FailureKind>,
    ) -> Self {
        Self {
            filename: filename.into(),
            overall_score: 0.0,
            category_results: protocol
                .categories()
                .iter()
                .map(|c| {
                    if c.is_applicable() {
                        CategoryResult::zeroed(c.key.clone(), issue)
                    } else {
                        CategoryResult::not_applicable(c.key.clone())
                    }
                })
                .collect(),
            summary: summary.into(),
            parse_degraded: true,
            failure,
        }
    }

    /// Compliance band of the overall score.
    pub fn band(&self) -> ComplianceBand {
        ComplianceBand::from_score(self.overall_score)
    }

    /// All recommendations across categories, first occurrence order, no duplicates.
    pub fn recommendations(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.category_results
            .iter()
            .flat_map(|c| c.recommendations.iter())
            .map(String::as_str)
            .filter(|r| seen.insert(*r))
            .collect()
    }
}

/// Traffic-light grouping of overall scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceBand {
    /// Score of 80 or more
    Compliant,
    /// Score from 60 up to 80
    NeedsImprovement,
    /// Score below 60
    NonCompliant,
}

impl ComplianceBand {
    /// Classify a score.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ComplianceBand::Compliant
        } else if score >= 60.0 {
            ComplianceBand::NeedsImprovement
        } else {
            ComplianceBand::NonCompliant
        }
    }
}

/// Aggregate statistics over one check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of documents checked
    pub documents: usize,

    /// Mean overall score, 0 for an empty run
    pub average_score: f64,

    /// Documents scoring 80 or more
    pub compliant: usize,

    /// Documents scoring 60 up to 80
    pub needs_improvement: usize,

    /// Documents scoring below 60
    pub non_compliant: usize,

    /// Reports flagged as degraded
    pub degraded: usize,

    /// When the summary was produced
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    /// Summarize a set of reports.
    pub fn from_reports(reports: &[ComplianceReport]) -> Self {
        let count_band = |band: ComplianceBand| reports.iter().filter(|r| r.band() == band).count();

        let average_score = if reports.is_empty() {
            0.0
        } else {
            reports.iter().map(|r| r.overall_score).sum::<f64>() / reports.len() as f64
        };

        Self {
            documents: reports.len(),
            average_score,
            compliant: count_band(ComplianceBand::Compliant),
            needs_improvement: count_band(ComplianceBand::NeedsImprovement),
            non_compliant: count_band(ComplianceBand::NonCompliant),
            degraded: reports.iter().filter(|r| r.parse_degraded).count(),
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Category;

    fn protocol() -> Protocol {
        Protocol::new(vec![
            Category::new("a", "A", vec!["a1".into()]),
            Category::new("b", "B", vec!["b1".into()]),
        ])
        .unwrap()
    }

    fn report_with_score(score: f64, degraded: bool) -> ComplianceReport {
        ComplianceReport {
            filename: "doc.txt".to_string(),
            overall_score: score,
            category_results: vec![],
            summary: String::new(),
            parse_degraded: degraded,
            failure: None,
        }
    }

    #[test]
    fn test_unparseable_report_shape() {
        let report = ComplianceReport::unparseable("x.txt", &protocol(), Language::En);
        assert_eq!(report.filename, "x.txt");
        assert!(report.parse_degraded);
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.category_results.len(), 2);
        assert_eq!(
            report.category_results[0].issues,
            vec!["could not parse model response"]
        );
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_invocation_failed_names_kind() {
        let report = ComplianceReport::invocation_failed(
            "x.txt",
            &protocol(),
            Language::En,
            FailureKind::RateLimit,
            "",
        );
        assert!(report.parse_degraded);
        assert_eq!(report.failure, Some(FailureKind::RateLimit));
        assert_eq!(report.summary, "The analysis could not be performed.");
        assert!(report
            .category_results
            .iter()
            .all(|c| c.issues == vec!["analysis failed: rate limit exceeded"]));
    }

    #[test]
    fn test_invocation_failed_carries_error_detail() {
        let report = ComplianceReport::invocation_failed(
            "x.txt",
            &protocol(),
            Language::De,
            FailureKind::Auth,
            "HTTP 401: Incorrect API key provided",
        );
        assert_eq!(
            report.summary,
            "Die Analyse konnte nicht durchgeführt werden. (HTTP 401: Incorrect API key provided)"
        );
    }

    fn protocol_with_empty_category() -> Protocol {
        Protocol::new(vec![
            Category::new("a", "A", vec!["a1".into()]),
            Category::new("video", "Video", vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn test_unparseable_keeps_empty_category_not_applicable() {
        let report =
            ComplianceReport::unparseable("x.txt", &protocol_with_empty_category(), Language::En);

        assert_eq!(report.category_results[0].issues, vec!["could not parse model response"]);
        assert!(!report.category_results[0].not_applicable);
        assert_eq!(
            report.category_results[1],
            CategoryResult::not_applicable("video")
        );
    }

    #[test]
    fn test_invocation_failed_keeps_empty_category_not_applicable() {
        let report = ComplianceReport::invocation_failed(
            "x.txt",
            &protocol_with_empty_category(),
            Language::En,
            FailureKind::Auth,
            "",
        );

        assert_eq!(
            report.category_results[0].issues,
            vec!["analysis failed: authentication rejected"]
        );
        assert_eq!(
            report.category_results[1],
            CategoryResult::not_applicable("video")
        );
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ComplianceBand::from_score(80.0), ComplianceBand::Compliant);
        assert_eq!(ComplianceBand::from_score(79.9), ComplianceBand::NeedsImprovement);
        assert_eq!(ComplianceBand::from_score(60.0), ComplianceBand::NeedsImprovement);
        assert_eq!(ComplianceBand::from_score(59.0), ComplianceBand::NonCompliant);
    }

    #[test]
    fn test_run_summary_counts() {
        let reports = vec![
            report_with_score(90.0, false),
            report_with_score(70.0, false),
            report_with_score(20.0, true),
        ];
        let summary = RunSummary::from_reports(&reports);

        assert_eq!(summary.documents, 3);
        assert_eq!(summary.average_score, 60.0);
        assert_eq!(summary.compliant, 1);
        assert_eq!(summary.needs_improvement, 1);
        assert_eq!(summary.non_compliant, 1);
        assert_eq!(summary.degraded, 1);
    }

    #[test]
    fn test_run_summary_empty() {
        let summary = RunSummary::from_reports(&[]);
        assert_eq!(summary.documents, 0);
        assert_eq!(summary.average_score, 0.0);
    }

    #[test]
    fn test_recommendations_deduplicated() {
        let mut report = report_with_score(50.0, false);
        report.category_results = vec![
            CategoryResult {
                category_key: "a".into(),
                score: 50.0,
                issues: vec![],
                recommendations: vec!["Add a privacy notice".into(), "Encrypt backups".into()],
                not_applicable: false,
            },
            CategoryResult {
                category_key: "b".into(),
                score: 50.0,
                issues: vec![],
                recommendations: vec!["Add a privacy notice".into()],
                not_applicable: false,
            },
        ];
        assert_eq!(
            report.recommendations(),
            vec!["Add a privacy notice", "Encrypt backups"]
        );
    }

    #[test]
    fn test_not_applicable_flag_omitted_when_false() {
        let json = serde_json::to_value(CategoryResult::zeroed("a", "x")).unwrap();
        assert!(json.get("not_applicable").is_none());
        let json = serde_json::to_value(CategoryResult::not_applicable("a")).unwrap();
        assert_eq!(json["not_applicable"], true);
    }
}
