//! Rules bind detectors to per-workflow weights and fold detector results
//! into weighted scores.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detectors::{ratio, Detector, DetectorKind, DetectorReport, DetectorSettings};
use crate::error::DetectorError;
use crate::history::HistoryModel;

/// A target collaboration workflow (e.g., "trunk-based").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow(pub String);

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weight per workflow. `None` and missing entries both weigh 0.
pub type Weights = BTreeMap<Workflow, Option<f64>>;

/// A named set of detectors with a weight vector over target workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub detectors: Vec<DetectorKind>,
    #[serde(default)]
    pub weights: Weights,
}

/// A detector that could not run. Its siblings are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: DetectorKind,
    pub message: String,
}

impl DetectorFailure {
    fn new(detector: DetectorKind, error: &DetectorError) -> Self {
        Self {
            detector,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorRun {
    pub detector: DetectorKind,
    pub report: DetectorReport,
}

/// Result of running one [`Rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub name: String,
    pub found: usize,
    pub total: usize,
    /// Sum of `found / total` over the detectors that ran.
    pub raw_score: f64,
    pub scores: BTreeMap<Workflow, f64>,
    pub reports: Vec<DetectorRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DetectorFailure>,
}

/// Per-workflow scores accumulated across rules, without normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scoreboard(BTreeMap<Workflow, f64>);

impl Scoreboard {
    pub fn add(&mut self, outcome: &RuleOutcome) {
        for (workflow, score) in &outcome.scores {
            *self.0.entry(workflow.clone()).or_insert(0.0) += score;
        }
    }

    pub fn score(&self, workflow: &Workflow) -> f64 {
        self.0.get(workflow).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Workflow, f64)> {
        self.0.iter().map(|(w, s)| (w, *s))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run a single detector, logging its outcome.
pub fn run_detector(
    detector: &dyn Detector,
    model: &HistoryModel,
) -> Result<DetectorReport, DetectorError> {
    let report = detector.run(model)?;
    debug!(
        detector = detector.name(),
        found = report.found,
        total = report.total,
        violated = report.violated,
        "detector finished"
    );
    Ok(report)
}

/// Run every detector of `kinds`, collecting reports and failures separately.
pub(crate) fn run_all(
    kinds: &[DetectorKind],
    model: &HistoryModel,
    settings: &DetectorSettings,
) -> (Vec<DetectorRun>, Vec<DetectorFailure>) {
    let mut reports = Vec::with_capacity(kinds.len());
    let mut failures = Vec::new();
    for &kind in kinds {
        let detector = kind.build(settings);
        match run_detector(detector.as_ref(), model) {
            Ok(report) => reports.push(DetectorRun {
                detector: kind,
                report,
            }),
            Err(e) => {
                warn!(detector = %kind, error = %e, "detector failed");
                failures.push(DetectorFailure::new(kind, &e));
            }
        }
    }
    (reports, failures)
}

/// `raw × weight`, with absent weights and non-finite products mapped to 0.
fn weighted(raw: f64, weight: Option<f64>) -> f64 {
    let score = raw * weight.unwrap_or(0.0);
    if score == 0.0 || !score.is_finite() {
        0.0
    } else {
        score
    }
}

pub fn run_rule(rule: &Rule, model: &HistoryModel, settings: &DetectorSettings) -> RuleOutcome {
    let (reports, failures) = run_all(&rule.detectors, model, settings);

    let found = reports.iter().map(|r| r.report.found).sum();
    let total = reports.iter().map(|r| r.report.total).sum();
    let raw_score = ratio(found, total);

    let scores = rule
        .weights
        .iter()
        .map(|(workflow, weight)| (workflow.clone(), weighted(raw_score, *weight)))
        .collect();

    RuleOutcome {
        name: rule.name.clone(),
        found,
        total,
        raw_score,
        scores,
        reports,
        failures,
    }
}

/// Run every rule in order and accumulate the scoreboard.
pub fn run_rules(
    rules: &[Rule],
    model: &HistoryModel,
    settings: &DetectorSettings,
) -> (Vec<RuleOutcome>, Scoreboard) {
    let mut scoreboard = Scoreboard::default();
    let outcomes = rules
        .iter()
        .map(|rule| {
            let outcome = run_rule(rule, model, settings);
            scoreboard.add(&outcome);
            outcome
        })
        .collect();
    (outcomes, scoreboard)
}
