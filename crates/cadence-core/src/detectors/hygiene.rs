//! Per-commit hygiene checks: empty commits, binary files, and commit
//! messages that are too short or say nothing.

use regex::Regex;

use crate::error::DetectorError;
use crate::history::{Commit, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

fn non_merge(model: &HistoryModel) -> Vec<&Commit> {
    model
        .commits()
        .into_iter()
        .filter(|c| !c.is_merge())
        .collect()
}

fn violation(commit: &Commit, kind: ViolationKind, severity: Severity, message: String) -> Violation {
    Violation::new(kind, severity, message, commit.author.email.clone())
        .at(commit.committer.time)
        .located(commit.hash.clone())
}

/// Non-merge commits that change nothing.
pub struct EmptyCommitDetector;

impl Detector for EmptyCommitDetector {
    fn name(&self) -> &'static str {
        "empty-commit"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let commits = non_merge(model);
        let violations: Vec<Violation> = commits
            .iter()
            .filter(|c| c.diffs.iter().all(|d| !d.binary && d.churn() == 0))
            .map(|c| {
                violation(
                    c,
                    ViolationKind::EmptyCommit {
                        commit: c.hash.clone(),
                    },
                    Severity::Violated,
                    format!("Commit {} changes no content", c.short_hash()),
                )
                .with_suggestion("Drop empty commits or fold them into the next real change.")
            })
            .collect();

        Ok(DetectorReport::new(violations.len(), commits.len(), violations))
    }
}

/// Non-merge commits that add or change binary files.
pub struct BinaryCommitDetector;

impl Detector for BinaryCommitDetector {
    fn name(&self) -> &'static str {
        "binary-commit"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let commits = non_merge(model);
        let mut violations = Vec::new();
        for commit in &commits {
            let files: Vec<String> = commit
                .diffs
                .iter()
                .filter(|d| d.binary)
                .map(|d| d.path.clone())
                .collect();
            if files.is_empty() {
                continue;
            }
            let message = format!(
                "Commit {} adds binary content: {}",
                commit.short_hash(),
                files.join(", ")
            );
            violations.push(
                violation(
                    commit,
                    ViolationKind::BinaryCommit {
                        commit: commit.hash.clone(),
                        files,
                    },
                    Severity::Suggestion,
                    message,
                )
                .with_suggestion("Keep build outputs and large assets out of version control."),
            );
        }

        Ok(DetectorReport::new(violations.len(), commits.len(), violations))
    }
}

/// Non-merge commits whose summary line is shorter than `min_length` characters.
pub struct ShortMessageDetector {
    min_length: usize,
}

impl ShortMessageDetector {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Detector for ShortMessageDetector {
    fn name(&self) -> &'static str {
        "short-message"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let commits = non_merge(model);
        let mut violations = Vec::new();
        for commit in &commits {
            let length = commit.summary().chars().count();
            if length >= self.min_length {
                continue;
            }
            violations.push(
                violation(
                    commit,
                    ViolationKind::ShortMessage {
                        commit: commit.hash.clone(),
                        length,
                    },
                    Severity::Violated,
                    format!(
                        "Commit {} has a {length}-character summary ('{}')",
                        commit.short_hash(),
                        commit.summary()
                    ),
                )
                .with_suggestion(format!(
                    "Describe the change in at least {} characters.",
                    self.min_length
                )),
            );
        }

        Ok(DetectorReport::new(violations.len(), commits.len(), violations))
    }
}

/// Non-merge commits whose whole summary matches a generic placeholder message.
pub struct NonDescriptiveMessageDetector {
    patterns: Vec<String>,
}

impl NonDescriptiveMessageDetector {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Each pattern must match the entire summary, ignoring case and trailing punctuation.
    fn compile(&self) -> Result<Vec<(String, Regex)>, DetectorError> {
        self.patterns
            .iter()
            .map(|p| {
                Regex::new(&format!(r"(?i)^\s*(?:{p})[.!]*\s*$"))
                    .map(|re| (p.clone(), re))
                    .map_err(|e| {
                        DetectorError::malformed("non-descriptive-message", format!("pattern '{p}': {e}"))
                    })
            })
            .collect()
    }
}

impl Detector for NonDescriptiveMessageDetector {
    fn name(&self) -> &'static str {
        "non-descriptive-message"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let compiled = self.compile()?;
        let commits = non_merge(model);
        let mut violations = Vec::new();
        for commit in &commits {
            let summary = commit.summary();
            let Some((pattern, _)) = compiled.iter().find(|(_, re)| re.is_match(summary)) else {
                continue;
            };
            violations.push(
                violation(
                    commit,
                    ViolationKind::NonDescriptiveMessage {
                        commit: commit.hash.clone(),
                        pattern: pattern.clone(),
                    },
                    Severity::Violated,
                    format!(
                        "Commit {} has a non-descriptive message '{summary}'",
                        commit.short_hash()
                    ),
                )
                .with_suggestion("Say what changed and why."),
            );
        }

        Ok(DetectorReport::new(violations.len(), commits.len(), violations))
    }
}
