//! Typed errors raised while building the history model and running detectors.

use thiserror::Error;

/// Errors raised while assembling a [`HistoryModel`](crate::history::HistoryModel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("commit {commit} references unknown parent {parent}")]
    UnknownParent { commit: String, parent: String },

    #[error("unknown commit {0}")]
    UnknownCommit(String),

    #[error("commit {0} is defined more than once")]
    DuplicateCommit(String),

    #[error("commit {commit} is its own ancestor")]
    CyclicHistory { commit: String },

    #[error("merge-base lookup failed for {first}..{second}: {reason}")]
    MergeBase {
        first: String,
        second: String,
        reason: String,
    },
}

/// Errors raised by a single detector run. None of them abort sibling detectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error("{detector}: required branch '{branch}' is missing from the history")]
    MissingBranch {
        detector: &'static str,
        branch: String,
    },

    #[error("{detector}: malformed input: {reason}")]
    MalformedInput {
        detector: &'static str,
        reason: String,
    },
}

impl DetectorError {
    pub fn missing_branch(detector: &'static str, branch: &str) -> Self {
        Self::MissingBranch {
            detector,
            branch: branch.to_string(),
        }
    }

    pub fn malformed(detector: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            detector,
            reason: reason.into(),
        }
    }
}
