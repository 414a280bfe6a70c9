//! Report rendering for the terminal and for machines.

use serde::Serialize;
use std::fmt::Write;

use dsgvo_core::{ComplianceBand, ComplianceReport, Protocol, RunSummary};

/// JSON document written by `check --format json`.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub reports: &'a [ComplianceReport],
    pub summary: &'a RunSummary,
}

/// Pretty JSON for a whole run.
pub fn render_json(
    reports: &[ComplianceReport],
    summary: &RunSummary,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOutput { reports, summary })
}

fn band_label(band: ComplianceBand) -> &'static str {
    match band {
        ComplianceBand::Compliant => "compliant",
        ComplianceBand::NeedsImprovement => "needs improvement",
        ComplianceBand::NonCompliant => "non-compliant",
    }
}

/// Human-readable text for a whole run.
pub fn render_text(reports: &[ComplianceReport], summary: &RunSummary, protocol: &Protocol) -> String {
    let mut out = String::new();
    for report in reports {
        write_report(&mut out, report, protocol);
        out.push('\n');
    }
    write_summary(&mut out, summary);
    out
}

// Writing into a String cannot fail.
fn write_report(out: &mut String, report: &ComplianceReport, protocol: &Protocol) {
    let _ = writeln!(out, "== {} ==", report.filename);
    let _ = write!(
        out,
        "Overall: {:.0}/100 ({})",
        report.overall_score,
        band_label(report.band())
    );
    if report.parse_degraded {
        out.push_str("  [DEGRADED]");
    }
    if let Some(kind) = report.failure {
        let _ = write!(out, "  [FAILED: {}]", kind);
    }
    out.push('\n');
    let _ = writeln!(out, "{}", report.summary);

    for result in &report.category_results {
        let title = protocol
            .category(&result.category_key)
            .map(|c| c.title.as_str())
            .unwrap_or(result.category_key.as_str());

        if result.not_applicable {
            let _ = writeln!(out, "  [{}] {}: n/a", result.category_key, title);
            continue;
        }
        let _ = writeln!(out, "  [{}] {}: {:.0}", result.category_key, title, result.score);
        for issue in &result.issues {
            let _ = writeln!(out, "      ! {}", issue);
        }
    }

    let recommendations = report.recommendations();
    if !recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for recommendation in recommendations {
            let _ = writeln!(out, "  - {}", recommendation);
        }
    }
}

fn write_summary(out: &mut String, summary: &RunSummary) {
    let _ = writeln!(
        out,
        "Checked {} document(s) at {}",
        summary.documents,
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Average score: {:.1}", summary.average_score);
    let _ = writeln!(
        out,
        "Compliant: {}  Needs improvement: {}  Non-compliant: {}",
        summary.compliant, summary.needs_improvement, summary.non_compliant
    );
    if summary.degraded > 0 {
        let _ = writeln!(out, "Degraded reports: {}", summary.degraded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsgvo_core::{parse_document_response, Category, FailureKind, Language};

    fn protocol() -> Protocol {
        Protocol::new(vec![
            Category::new("consent", "Consent", vec!["Opt-out offered".into()]),
            Category::new("video", "Video surveillance", vec![]),
        ])
        .unwrap()
    }

    fn good_report() -> ComplianceReport {
        let reply = r#"{"summary": "Fine", "category_results": [
            {"category_key": "consent", "score": 85, "issues": ["Small gap"], "recommendations": ["Close it"]}
        ]}"#;
        parse_document_response("good.txt", reply, &protocol(), Language::En)
    }

    #[test]
    fn test_text_shows_scores_and_titles() {
        let reports = vec![good_report()];
        let text = render_text(&reports, &RunSummary::from_reports(&reports), &protocol());

        assert!(text.contains("== good.txt =="));
        assert!(text.contains("Overall: 85/100 (compliant)"));
        assert!(text.contains("[consent] Consent: 85"));
        assert!(text.contains("[video] Video surveillance: n/a"));
        assert!(text.contains("! Small gap"));
        assert!(text.contains("- Close it"));
        assert!(!text.contains("[DEGRADED]"));
    }

    #[test]
    fn test_text_flags_degraded_and_failed_reports() {
        let reports = vec![ComplianceReport::invocation_failed(
            "bad.txt",
            &protocol(),
            Language::En,
            FailureKind::Auth,
            "HTTP 401: invalid key",
        )];
        let text = render_text(&reports, &RunSummary::from_reports(&reports), &protocol());

        assert!(text.contains("[DEGRADED]"));
        assert!(text.contains("[FAILED: auth]"));
        assert!(text.contains("HTTP 401: invalid key"));
        assert!(text.contains("[video] Video surveillance: n/a"));
        assert!(text.contains("Degraded reports: 1"));
    }

    #[test]
    fn test_json_contains_reports_and_summary() {
        let reports = vec![good_report()];
        let summary = RunSummary::from_reports(&reports);
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&reports, &summary).unwrap()).unwrap();

        assert_eq!(json["reports"][0]["filename"], "good.txt");
        assert_eq!(json["reports"][0]["parse_degraded"], false);
        assert_eq!(json["summary"]["documents"], 1);
    }
}
