use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{FileDiff, RawFileDiff};
use crate::error::HistoryError;
use crate::graph::{CommitGraph, CommitLookup};
use crate::matrix::{BranchMatrix, DagMergeBases, MergeBaseProvider};
use crate::types::Signature;

/// A commit as reported by the commit provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommit {
    pub hash: String,
    #[serde(default)]
    pub tree: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub diffs: Vec<RawFileDiff>,
    #[serde(default)]
    pub patch_id: Option<String>,
}

/// A branch reference as reported by the branch provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBranch {
    pub name: String,
    pub head: String,
}

/// A tag reference as reported by the tag provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTag {
    pub name: String,
    pub target: String,
}

/// Everything the engine needs from the outside world, fully materialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHistory {
    #[serde(default)]
    pub commits: Vec<RawCommit>,
    #[serde(default)]
    pub branches: Vec<RawBranch>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
}

/// Immutable commit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    pub diffs: Vec<FileDiff>,
    pub patch_id: Option<String>,
}

impl Commit {
    pub fn from_raw(raw: &RawCommit) -> Self {
        Self {
            hash: raw.hash.clone(),
            tree: raw.tree.clone(),
            parents: raw.parents.clone(),
            author: raw.author.clone(),
            committer: raw.committer.clone(),
            message: raw.message.clone(),
            diffs: raw.diffs.iter().map(FileDiff::from_raw).collect(),
            patch_id: raw.patch_id.clone(),
        }
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First line of the message, trimmed.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Abbreviated hash for messages.
    pub fn short_hash(&self) -> &str {
        short_hash(&self.hash)
    }
}

pub(crate) fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(8) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

/// A named reference with the graph reachable from its head.
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    pub head: String,
    pub graph: CommitGraph,
}

/// A tag with the committer identity of the commit it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub target: String,
    pub committer: Signature,
}

/// Read-only snapshot of a project's history, built once per analysis run.
#[derive(Debug, Clone)]
pub struct HistoryModel {
    commits: HashMap<String, Commit>,
    branches: Vec<Branch>,
    tags: Vec<Tag>,
    matrix: BranchMatrix,
}

impl HistoryModel {
    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.commits.get(hash)
    }

    /// All commits ordered by committer time, then hash.
    pub fn commits(&self) -> Vec<&Commit> {
        let mut commits: Vec<_> = self.commits.values().collect();
        commits.sort_by(|a, b| {
            a.committer
                .time
                .cmp(&b.committer.time)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        commits
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn matrix(&self) -> &BranchMatrix {
        &self.matrix
    }

    /// Most recent committer time in the snapshot.
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        self.commits.values().map(|c| c.committer.time).max()
    }
}

impl CommitLookup for HistoryModel {
    fn lookup(&self, hash: &str) -> Result<&Commit, HistoryError> {
        self.commits.lookup(hash)
    }
}

/// Build the history model, computing merge bases from the commit DAG itself.
pub fn build_history_model(raw: &RawHistory) -> Result<HistoryModel, HistoryError> {
    let commits = index_commits(&raw.commits)?;
    let provider = DagMergeBases::new(&commits);
    let (branches, tags, matrix) = assemble(raw, &commits, &provider)?;
    Ok(HistoryModel {
        commits,
        branches,
        tags,
        matrix,
    })
}

/// Build the history model, delegating merge-base computation to `provider`.
pub fn build_history_model_with(
    raw: &RawHistory,
    provider: &dyn MergeBaseProvider,
) -> Result<HistoryModel, HistoryError> {
    let commits = index_commits(&raw.commits)?;
    let (branches, tags, matrix) = assemble(raw, &commits, provider)?;
    Ok(HistoryModel {
        commits,
        branches,
        tags,
        matrix,
    })
}

fn index_commits(raw: &[RawCommit]) -> Result<HashMap<String, Commit>, HistoryError> {
    let mut commits = HashMap::with_capacity(raw.len());
    for rc in raw {
        if commits.insert(rc.hash.clone(), Commit::from_raw(rc)).is_some() {
            return Err(HistoryError::DuplicateCommit(rc.hash.clone()));
        }
    }

    for commit in commits.values() {
        if let Some(missing) = commit.parents.iter().find(|p| !commits.contains_key(*p)) {
            return Err(HistoryError::UnknownParent {
                commit: commit.hash.clone(),
                parent: missing.clone(),
            });
        }
    }

    reject_cycles(&commits)?;
    Ok(commits)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Open,
    Done,
}

/// Depth-first walk over the parent edges; meeting an open commit again
/// means the parents loop back on themselves.
fn reject_cycles(commits: &HashMap<String, Commit>) -> Result<(), HistoryError> {
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(commits.len());
    let mut starts: Vec<&str> = commits.keys().map(String::as_str).collect();
    starts.sort_unstable();

    for start in starts {
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(start, Mark::Open);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        while let Some((hash, next)) = stack.pop() {
            let commit = commits.lookup(hash)?;
            match commit.parents.get(next) {
                Some(parent) => {
                    stack.push((hash, next + 1));
                    match marks.get(parent.as_str()) {
                        Some(Mark::Open) => {
                            return Err(HistoryError::CyclicHistory {
                                commit: parent.clone(),
                            })
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(parent.as_str(), Mark::Open);
                            stack.push((parent.as_str(), 0));
                        }
                    }
                }
                None => {
                    marks.insert(hash, Mark::Done);
                }
            }
        }
    }
    Ok(())
}

fn assemble(
    raw: &RawHistory,
    commits: &HashMap<String, Commit>,
    provider: &dyn MergeBaseProvider,
) -> Result<(Vec<Branch>, Vec<Tag>, BranchMatrix), HistoryError> {
    let mut branches = raw
        .branches
        .iter()
        .map(|rb| {
            let graph = CommitGraph::build(&rb.head, commits)?;
            Ok(Branch {
                name: rb.name.clone(),
                head: rb.head.clone(),
                graph,
            })
        })
        .collect::<Result<Vec<_>, HistoryError>>()?;
    branches.sort_by(|a, b| a.name.cmp(&b.name));

    let tags = raw
        .tags
        .iter()
        .map(|rt| {
            let commit = commits.lookup(&rt.target)?;
            Ok(Tag {
                name: rt.name.clone(),
                target: rt.target.clone(),
                committer: commit.committer.clone(),
            })
        })
        .collect::<Result<Vec<_>, HistoryError>>()?;

    let matrix = BranchMatrix::build(&branches, provider)?;
    Ok((branches, tags, matrix))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_build_model() {
        let model = model(
            vec![
                raw_commit("a", &[], 0),
                raw_commit("b", &["a"], 1),
                raw_commit("c", &["a"], 2),
            ],
            vec![branch("main", "b"), branch("feature/x", "c")],
            vec![tag("v1.0.0", "b")],
        );

        assert_eq!(model.commit_count(), 3);
        assert_eq!(model.branches().len(), 2);
        // sorted by name
        assert_eq!(model.branches()[0].name, "feature/x");
        assert_eq!(model.branch("main").unwrap().graph.len(), 2);
        assert_eq!(model.tags()[0].committer.time, at(1));
        assert_eq!(model.latest_activity(), Some(at(2)));
        assert_eq!(model.matrix().len(), 1);
    }

    #[test]
    fn test_commits_are_time_ordered() {
        let model = model(
            vec![
                raw_commit("z", &[], 0),
                raw_commit("y", &["z"], 5),
                raw_commit("x", &["y"], 3),
            ],
            vec![],
            vec![],
        );
        let order: Vec<_> = model.commits().iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(order, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let err = build_history_model(&RawHistory {
            commits: vec![raw_commit("b", &["missing"], 1)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            HistoryError::UnknownParent {
                commit: "b".to_string(),
                parent: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_branch_head_is_rejected() {
        let err = build_history_model(&RawHistory {
            commits: vec![raw_commit("a", &[], 0)],
            branches: vec![branch("main", "nope")],
            tags: vec![],
        })
        .unwrap_err();
        assert_eq!(err, HistoryError::UnknownCommit("nope".to_string()));
    }

    #[test]
    fn test_duplicate_commit_is_rejected() {
        let err = build_history_model(&RawHistory {
            commits: vec![raw_commit("a", &[], 0), raw_commit("a", &[], 1)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, HistoryError::DuplicateCommit("a".to_string()));
    }

    #[test]
    fn test_parent_cycle_is_rejected() {
        let err = build_history_model(&RawHistory {
            commits: vec![raw_commit("a", &["b"], 0), raw_commit("b", &["a"], 1)],
            branches: vec![branch("main", "a")],
            tags: vec![],
        })
        .unwrap_err();
        assert_eq!(
            err,
            HistoryError::CyclicHistory {
                commit: "a".to_string()
            }
        );

        let err = build_history_model(&RawHistory {
            commits: vec![raw_commit("a", &["a"], 0)],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, HistoryError::CyclicHistory { .. }));
    }

    #[test]
    fn test_shared_ancestors_are_not_cycles() {
        let model = model(
            vec![
                raw_commit("root", &[], 0),
                raw_commit("left", &["root"], 1),
                raw_commit("right", &["root"], 2),
                raw_commit("merge", &["left", "right"], 3),
            ],
            vec![branch("main", "merge")],
            vec![],
        );
        assert_eq!(model.commit_count(), 4);
    }

    #[test]
    fn test_commit_helpers() {
        let mut c = commit("0123456789abcdef", &["p1", "p2"], 0);
        c.message = "  Add login form  \n\nLonger body".to_string();
        assert!(c.is_merge());
        assert!(!c.is_root());
        assert_eq!(c.summary(), "Add login form");
        assert_eq!(c.short_hash(), "01234567");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_raw_history_from_json() {
        let json = r#"{
            "commits": [{
                "hash": "a",
                "author": {"name": "Ann", "email": "ann@example.com", "time": "2024-01-01T00:00:00Z"},
                "committer": {"name": "Ann", "email": "ann@example.com", "time": "2024-01-01T00:00:00Z"},
                "message": "Initial commit",
                "diffs": [{"path": "README.md", "chunks": [{"kind": "add", "lines": 3}]}]
            }],
            "branches": [{"name": "main", "head": "a"}]
        }"#;
        let raw: RawHistory = serde_json::from_str(json).unwrap();
        let model = build_history_model(&raw).unwrap();
        let commit = model.commit("a").unwrap();
        assert_eq!(commit.diffs[0].lines_added, 3);
        assert!(model.tags().is_empty());
    }
}
