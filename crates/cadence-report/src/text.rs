use colored::Colorize;

use cadence_core::analysis::AnalysisReport;
use cadence_core::grading::{ContributorGrade, MAX_GRADE};
use cadence_core::runner::Scoreboard;
use cadence_core::types::{Severity, Violation};

/// Format a full analysis report for terminal output.
pub fn format_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "Cadence - Workflow Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    let summary = &report.summary;
    out.push_str(&format!(
        "{}: {} commits, {} branches, {} tags\n",
        "Summary".bold(),
        summary.commits,
        summary.branches,
        summary.tags,
    ));
    if let Some(latest) = summary.latest_activity {
        out.push_str(&format!("  Latest activity: {}\n", latest.format("%Y-%m-%d %H:%M UTC")));
    }

    out.push_str(&format_scoreboard(&report.scoreboard));

    out.push_str(&format!("\n{}\n{}\n", "Rules".bold(), "-".repeat(40)));
    for rule in &report.rules {
        out.push_str(&format!(
            "  {:<28} {:>4}/{:<4} raw {:.3}\n",
            rule.name, rule.found, rule.total, rule.raw_score
        ));
    }

    if !report.grades.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Contributors".bold(), "-".repeat(40)));
        for grade in &report.grades {
            out.push_str(&format_grade(grade));
        }
    }

    let violations: Vec<&Violation> = report.violations().collect();
    if violations.is_empty() {
        out.push_str(&format!("\n{}\n", "No violations found!".green().bold()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Violations".red().bold(),
            violations.len(),
            "-".repeat(40),
        ));
        for v in violations {
            out.push_str(&format_violation(v));
        }
    }

    if !report.failures.is_empty() {
        out.push_str(&format!(
            "\n{} ({} skipped)\n",
            "Detector failures".yellow().bold(),
            report.failures.len()
        ));
        for failure in &report.failures {
            out.push_str(&format!("  {}: {}\n", failure.detector, failure.message));
        }
    }

    out.push('\n');
    out
}

fn format_scoreboard(scoreboard: &Scoreboard) -> String {
    let mut out = String::new();
    if scoreboard.is_empty() {
        return out;
    }
    out.push_str(&format!(
        "\n{} (lower is closer to the workflow)\n",
        "Workflow Scores".bold()
    ));
    for (workflow, score) in scoreboard.iter() {
        out.push_str(&format!("  {:<20} {:.3}\n", workflow.as_str(), score));
    }
    out
}

fn format_grade(grade: &ContributorGrade) -> String {
    let shown = format!("{}/{MAX_GRADE}", grade.grade);
    let colored = match grade.grade {
        3 => shown.green(),
        2 => shown.yellow(),
        _ => shown.red(),
    };
    format!(
        "  {:<24} {:<16} {} ({} violations / {:.1})\n",
        grade.login, grade.marker, colored, grade.violations, grade.denominator
    )
}

fn format_violation(v: &Violation) -> String {
    let severity_str = match v.severity {
        Severity::Violated => "VIOLATED".red().bold().to_string(),
        Severity::Suggestion => "SUGGEST".yellow().bold().to_string(),
    };

    let mut out = format!(
        "\n  {} [{}] {}",
        severity_str,
        v.kind,
        v.location.as_deref().unwrap_or("-")
    );
    if let Some(time) = v.time {
        out.push_str(&format!(" ({})", time.format("%Y-%m-%d")));
    }
    out.push('\n');
    out.push_str(&format!("    {} ({})\n", v.message, v.author_email));
    if let Some(ref suggestion) = v.suggestion {
        out.push_str(&format!("    {}: {}\n", "Suggestion".cyan(), suggestion));
    }
    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(report: &AnalysisReport, fail_on: Severity) -> (String, bool) {
    let failing = report.count_at_least(fail_on);
    let passed = failing == 0;

    let mut out = format_report(report);

    if passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "{}: {} violation(s) at severity {} or above\n",
            "CHECK FAILED".red().bold(),
            failing,
            fail_on,
        ));
    }

    (out, passed)
}
