use serde::{Deserialize, Serialize};

use crate::error::DetectorError;
use crate::history::{Commit, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Atomicity score of one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDistance {
    pub hash: String,
    pub author_email: String,
    pub files: usize,
    pub distance: f64,
}

/// Distance between two paths in the tree: 0 for the same file, 1 within the
/// same directory, otherwise 1 plus the directory segments separating them.
pub fn directory_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let dir_a = parent_segments(a);
    let dir_b = parent_segments(b);
    if dir_a == dir_b {
        return 1;
    }
    let common = dir_a
        .iter()
        .zip(&dir_b)
        .take_while(|(x, y)| x == y)
        .count();
    1 + (dir_a.len() - common) + (dir_b.len() - common)
}

fn parent_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

/// Sum over touched files of edit spread times the average directory
/// distance to the other touched files. Single-file commits score 0.
pub fn commit_distance(commit: &Commit) -> f64 {
    let files = &commit.diffs;
    if files.len() < 2 {
        return 0.0;
    }
    let others = (files.len() - 1) as f64;

    files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let total: usize = files
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| directory_distance(&file.path, &other.path))
                .sum();
            file.edit_spread() * (total as f64 / others)
        })
        .sum()
}

/// Raw distance distribution over every non-merge commit that changes files.
pub fn commit_distances(model: &HistoryModel) -> Vec<CommitDistance> {
    model
        .commits()
        .into_iter()
        .filter(|c| !c.is_merge() && !c.diffs.is_empty())
        .map(|c| CommitDistance {
            hash: c.hash.clone(),
            author_email: c.author.email.clone(),
            files: c.diffs.len(),
            distance: commit_distance(c),
        })
        .collect()
}

/// Reports commit distances. Without a threshold it only measures; with one
/// it suggests splitting commits above it.
pub struct CommitDistanceDetector {
    threshold: Option<f64>,
}

impl CommitDistanceDetector {
    pub fn new(threshold: Option<f64>) -> Self {
        Self { threshold }
    }
}

impl Detector for CommitDistanceDetector {
    fn name(&self) -> &'static str {
        "commit-distance"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let distances = commit_distances(model);
        let total = distances.len();

        let Some(threshold) = self.threshold else {
            return Ok(DetectorReport::new(0, total, vec![]));
        };

        let violations: Vec<Violation> = distances
            .into_iter()
            .filter(|d| d.distance > threshold)
            .map(|d| {
                let time = model.commit(&d.hash).map(|c| c.committer.time);
                let mut v = Violation::new(
                    ViolationKind::CommitDistance {
                        commit: d.hash.clone(),
                        distance: d.distance,
                    },
                    Severity::Suggestion,
                    format!(
                        "Commit {} touches {} scattered files (distance {:.1} > {threshold:.1})",
                        crate::history::short_hash(&d.hash),
                        d.files,
                        d.distance
                    ),
                    d.author_email,
                )
                .with_suggestion("Split unrelated changes into separate commits.")
                .located(d.hash);
                v.time = time;
                v
            })
            .collect();

        Ok(DetectorReport::new(violations.len(), total, violations))
    }
}
