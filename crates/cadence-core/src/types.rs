use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity attached to a commit: who and when.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: DateTime<Utc>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Severity of a violation.
/// `Suggestion` is advisory; `Violated` is a hard deviation from the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Suggestion,
    Violated,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Suggestion => write!(f, "suggestion"),
            Severity::Violated => write!(f, "violated"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suggestion" | "suggest" => Ok(Severity::Suggestion),
            "violated" | "violation" => Ok(Severity::Violated),
            _ => Err(anyhow::anyhow!("unknown severity: {s}")),
        }
    }
}

/// Kind of workflow violation, one variant per detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolationKind {
    StaleBranch {
        branch: String,
        days_inactive: i64,
    },
    BranchNaming {
        branch: String,
        expected: String,
    },
    FeatureBranchBypass {
        commit: String,
    },
    CherryPick {
        commit: String,
        original: String,
        patch_id: String,
    },
    ReleaseCherryPick {
        commit: String,
        patch_id: String,
    },
    CrissCrossMerge {
        first: String,
        second: String,
        merge_bases: Vec<String>,
    },
    CommitDistance {
        commit: String,
        distance: f64,
    },
    Hotfix {
        tag: String,
        next_tag: String,
    },
    EmptyCommit {
        commit: String,
    },
    BinaryCommit {
        commit: String,
        files: Vec<String>,
    },
    ShortMessage {
        commit: String,
        length: usize,
    },
    NonDescriptiveMessage {
        commit: String,
        pattern: String,
    },
}

impl ViolationKind {
    /// Stable kebab-case name of the violation kind.
    pub fn name(&self) -> &'static str {
        match self {
            ViolationKind::StaleBranch { .. } => "stale-branch",
            ViolationKind::BranchNaming { .. } => "branch-naming",
            ViolationKind::FeatureBranchBypass { .. } => "feature-branch-bypass",
            ViolationKind::CherryPick { .. } => "cherry-pick",
            ViolationKind::ReleaseCherryPick { .. } => "cherry-pick-release",
            ViolationKind::CrissCrossMerge { .. } => "criss-cross-merge",
            ViolationKind::CommitDistance { .. } => "commit-distance",
            ViolationKind::Hotfix { .. } => "hotfix",
            ViolationKind::EmptyCommit { .. } => "empty-commit",
            ViolationKind::BinaryCommit { .. } => "binary-commit",
            ViolationKind::ShortMessage { .. } => "short-message",
            ViolationKind::NonDescriptiveMessage { .. } => "non-descriptive-message",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A workflow violation attributed to one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
    pub author_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        severity: Severity,
        message: impl Into<String>,
        author_email: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            suggestion: None,
            author_email: author_email.into(),
            time: None,
            location: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn located(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
