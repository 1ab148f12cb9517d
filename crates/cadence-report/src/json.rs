use anyhow::{Context, Result};
use serde::Serialize;

use cadence_core::analysis::AnalysisReport;
use cadence_core::types::Severity;

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("failed to serialize report")
}

/// Format a full analysis report as JSON.
pub fn format_report(report: &AnalysisReport, compact: bool) -> Result<String> {
    to_json(report, compact)
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: &'a AnalysisReport,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub fail_on: Severity,
    pub failing_violation_count: usize,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    report: &AnalysisReport,
    fail_on: Severity,
    compact: bool,
) -> Result<(String, bool)> {
    let failing_count = report.count_at_least(fail_on);
    let passed = failing_count == 0;

    let output = CheckOutput {
        report,
        check: CheckStatus {
            passed,
            fail_on,
            failing_violation_count: failing_count,
        },
    };

    Ok((to_json(&output, compact)?, passed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    #[test]
    fn test_format_report_valid_json() {
        let json = format_report(&sample::report(true), false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["summary"]["commits"], 8);
        assert_eq!(parsed["scoreboard"]["trunk-based"], 0.25);
        assert_eq!(parsed["rules"][0]["reports"][0]["detector"], "non-descriptive-message");
        assert_eq!(
            parsed["rules"][0]["reports"][0]["report"]["violations"][0]["severity"],
            "violated"
        );
        assert_eq!(parsed["failures"][0]["detector"], "cherry-pick-release");
    }

    #[test]
    fn test_format_report_round_trips() {
        let report = sample::report(true);
        let json = format_report(&report, true).unwrap();
        assert!(!json.contains('\n'), "compact JSON should be single line");
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_format_check_failed() {
        let (json, passed) =
            format_check(&sample::report(true), Severity::Violated, false).unwrap();
        assert!(!passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["check"]["passed"], false);
        assert_eq!(parsed["check"]["failing_violation_count"], 1);
        assert_eq!(parsed["check"]["fail_on"], "violated");
        // flattened report fields stay at the top level
        assert!(parsed.get("rules").is_some());
    }

    #[test]
    fn test_format_check_passed() {
        let (json, passed) =
            format_check(&sample::report(false), Severity::Suggestion, false).unwrap();
        assert!(passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["check"]["failing_violation_count"], 0);
    }
}
