//! End-to-end analysis of one history snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::grading::{contributions_from_commits, run_markers, ContributorGrade, Contributions};
use crate::history::HistoryModel;
use crate::identity::IdentityResolver;
use crate::runner::{run_rules, DetectorFailure, RuleOutcome, Scoreboard};
use crate::types::{Severity, Violation};

/// Size of the analyzed history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub commits: usize,
    pub branches: usize,
    pub tags: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_activity: Option<DateTime<Utc>>,
}

impl HistorySummary {
    pub fn of(model: &HistoryModel) -> Self {
        Self {
            commits: model.commit_count(),
            branches: model.branches().len(),
            tags: model.tags().len(),
            latest_activity: model.latest_activity(),
        }
    }
}

/// Everything one analysis produced, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: HistorySummary,
    pub rules: Vec<RuleOutcome>,
    pub scoreboard: Scoreboard,
    pub grades: Vec<ContributorGrade>,
    /// Every detector that could not run, once per detector and cause.
    pub failures: Vec<DetectorFailure>,
}

impl AnalysisReport {
    /// All violations across rules. A detector bound to several rules
    /// contributes its violations once per rule.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.rules
            .iter()
            .flat_map(|r| &r.reports)
            .flat_map(|run| &run.report.violations)
    }

    /// Number of violations at `severity` or worse.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.violations().filter(|v| v.severity >= severity).count()
    }
}

/// Run the configured rules and markers over `model`. Without a
/// contribution table, commit counts per contributor are used.
pub fn analyze(
    model: &HistoryModel,
    config: &Config,
    resolver: &dyn IdentityResolver,
    contributions: Option<&Contributions>,
) -> AnalysisReport {
    let settings = config.detector_settings();
    let (rules, scoreboard) = run_rules(&config.rules, model, &settings);

    let derived;
    let contributions = match contributions {
        Some(c) => c,
        None => {
            derived = contributions_from_commits(model, resolver);
            &derived
        }
    };
    let markers = run_markers(&config.markers, model, &settings, resolver, contributions);

    let mut failures: Vec<DetectorFailure> = rules
        .iter()
        .flat_map(|r| r.failures.iter().cloned())
        .chain(markers.failures)
        .collect();
    failures.sort();
    failures.dedup();

    AnalysisReport {
        summary: HistorySummary::of(model),
        rules,
        scoreboard,
        grades: markers.grades,
        failures,
    }
}
