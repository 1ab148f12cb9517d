//! Workflow detectors.
//!
//! Every detector implements [`Detector`]: it reads a [`HistoryModel`] and
//! returns a fresh [`DetectorReport`]. Detectors hold configuration only, so
//! the same instance can be run any number of times against any model.

mod bypass;
mod cherry_pick;
mod criss_cross;
mod distance;
mod hotfix;
mod hygiene;
mod naming;
mod staleness;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DetectorError;
use crate::history::HistoryModel;
use crate::types::{Severity, Violation};

pub use bypass::FeatureBranchBypassDetector;
pub use cherry_pick::{CherryPickDetector, ReleaseCherryPickDetector};
pub use criss_cross::CrissCrossMergeDetector;
pub use distance::{
    commit_distance, commit_distances, directory_distance, CommitDistance,
    CommitDistanceDetector,
};
pub use hotfix::HotfixDetector;
pub use hygiene::{
    BinaryCommitDetector, EmptyCommitDetector, NonDescriptiveMessageDetector,
    ShortMessageDetector,
};
pub use naming::{longest_common_substring, similarity, BranchNamingDetector};
pub use staleness::StaleBranchDetector;

/// Trait that each detector must implement.
pub trait Detector: Send + Sync {
    /// Stable kebab-case name (e.g., "hotfix")
    fn name(&self) -> &'static str;

    /// Analyze the model. Fails only when a precondition is missing or the
    /// input is malformed for this detector.
    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError>;
}

/// Outcome of one detector run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorReport {
    /// Violations with `Severity::Violated`.
    pub violated: usize,
    pub found: usize,
    pub total: usize,
    pub violations: Vec<Violation>,
}

impl DetectorReport {
    pub fn new(found: usize, total: usize, violations: Vec<Violation>) -> Self {
        let violated = violations
            .iter()
            .filter(|v| v.severity == Severity::Violated)
            .count();
        Self {
            violated,
            found,
            total,
            violations,
        }
    }

    /// `found / total`, or 0 when there is nothing to measure.
    pub fn ratio(&self) -> f64 {
        ratio(self.found, self.total)
    }
}

pub(crate) fn ratio(found: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        found as f64 / total as f64
    }
}

/// Settings shared by the detector set, derived from [`Config`](crate::config::Config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub primary_branch: String,
    pub release_branch: String,
    pub exempt_branches: Vec<String>,
    pub stale_after_days: i64,
    pub similarity_factor: f64,
    pub min_substring_len: usize,
    pub separators: Vec<String>,
    pub min_message_length: usize,
    pub non_descriptive_patterns: Vec<String>,
    pub distance_threshold: Option<f64>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        crate::config::Config::default().detector_settings()
    }
}

/// The closed set of detectors, addressable by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    StaleBranch,
    BranchNaming,
    FeatureBranchBypass,
    CherryPick,
    CherryPickRelease,
    CrissCrossMerge,
    CommitDistance,
    Hotfix,
    EmptyCommit,
    BinaryCommit,
    ShortMessage,
    NonDescriptiveMessage,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 12] = [
        DetectorKind::StaleBranch,
        DetectorKind::BranchNaming,
        DetectorKind::FeatureBranchBypass,
        DetectorKind::CherryPick,
        DetectorKind::CherryPickRelease,
        DetectorKind::CrissCrossMerge,
        DetectorKind::CommitDistance,
        DetectorKind::Hotfix,
        DetectorKind::EmptyCommit,
        DetectorKind::BinaryCommit,
        DetectorKind::ShortMessage,
        DetectorKind::NonDescriptiveMessage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::StaleBranch => "stale-branch",
            DetectorKind::BranchNaming => "branch-naming",
            DetectorKind::FeatureBranchBypass => "feature-branch-bypass",
            DetectorKind::CherryPick => "cherry-pick",
            DetectorKind::CherryPickRelease => "cherry-pick-release",
            DetectorKind::CrissCrossMerge => "criss-cross-merge",
            DetectorKind::CommitDistance => "commit-distance",
            DetectorKind::Hotfix => "hotfix",
            DetectorKind::EmptyCommit => "empty-commit",
            DetectorKind::BinaryCommit => "binary-commit",
            DetectorKind::ShortMessage => "short-message",
            DetectorKind::NonDescriptiveMessage => "non-descriptive-message",
        }
    }

    /// Instantiate the detector with its slice of the settings.
    pub fn build(&self, settings: &DetectorSettings) -> Box<dyn Detector> {
        match self {
            DetectorKind::StaleBranch => Box::new(StaleBranchDetector::new(
                settings.exempt_branches.clone(),
                settings.stale_after_days,
            )),
            DetectorKind::BranchNaming => Box::new(BranchNamingDetector::new(
                settings.exempt_branches.clone(),
                settings.similarity_factor,
                settings.min_substring_len,
                settings.separators.clone(),
            )),
            DetectorKind::FeatureBranchBypass => Box::new(FeatureBranchBypassDetector::new(
                settings.primary_branch.clone(),
            )),
            DetectorKind::CherryPick => Box::new(CherryPickDetector),
            DetectorKind::CherryPickRelease => Box::new(ReleaseCherryPickDetector::new(
                settings.primary_branch.clone(),
                settings.release_branch.clone(),
            )),
            DetectorKind::CrissCrossMerge => Box::new(CrissCrossMergeDetector),
            DetectorKind::CommitDistance => {
                Box::new(CommitDistanceDetector::new(settings.distance_threshold))
            }
            DetectorKind::Hotfix => Box::new(HotfixDetector),
            DetectorKind::EmptyCommit => Box::new(EmptyCommitDetector),
            DetectorKind::BinaryCommit => Box::new(BinaryCommitDetector),
            DetectorKind::ShortMessage => {
                Box::new(ShortMessageDetector::new(settings.min_message_length))
            }
            DetectorKind::NonDescriptiveMessage => Box::new(NonDescriptiveMessageDetector::new(
                settings.non_descriptive_patterns.clone(),
            )),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DetectorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown detector: {s}"))
    }
}
