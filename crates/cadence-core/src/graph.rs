use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::history::Commit;
use crate::types::Signature;

/// Resolves a commit hash to its record. Implemented by whatever holds the raw commits.
pub trait CommitLookup {
    fn lookup(&self, hash: &str) -> Result<&Commit, HistoryError>;
}

impl CommitLookup for HashMap<String, Commit> {
    fn lookup(&self, hash: &str) -> Result<&Commit, HistoryError> {
        self.get(hash)
            .ok_or_else(|| HistoryError::UnknownCommit(hash.to_string()))
    }
}

/// Node in the commit graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNode {
    pub hash: String,
    pub author: Signature,
    pub committer: Signature,
}

/// Edge from a commit to one of its parents. `ordinal` keeps the parent order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentEdge {
    pub ordinal: usize,
}

/// DAG of every commit reachable from one head, edges pointing child -> parent.
#[derive(Debug, Clone)]
pub struct CommitGraph {
    graph: DiGraph<CommitNode, ParentEdge>,
    index: HashMap<String, NodeIndex>,
    head: NodeIndex,
}

impl CommitGraph {
    /// Materialize the graph reachable from `head`.
    ///
    /// Uses a work-list instead of recursion, and the hash index as a memo
    /// table so each commit becomes exactly one node even when reachable
    /// through several paths.
    pub fn build(head: &str, lookup: &impl CommitLookup) -> Result<Self, HistoryError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        let head_commit = lookup.lookup(head)?;
        let head_idx = graph.add_node(node_for(head_commit));
        index.insert(head_commit.hash.clone(), head_idx);

        let mut work: Vec<(NodeIndex, &Commit)> = vec![(head_idx, head_commit)];
        while let Some((idx, commit)) = work.pop() {
            for (ordinal, parent_hash) in commit.parents.iter().enumerate() {
                let parent_idx = match index.get(parent_hash) {
                    Some(&existing) => existing,
                    None => {
                        let parent = lookup.lookup(parent_hash)?;
                        let created = graph.add_node(node_for(parent));
                        index.insert(parent.hash.clone(), created);
                        work.push((created, parent));
                        created
                    }
                };
                graph.add_edge(idx, parent_idx, ParentEdge { ordinal });
            }
        }

        Ok(Self {
            graph,
            index,
            head: head_idx,
        })
    }

    pub fn head(&self) -> NodeIndex {
        self.head
    }

    pub fn head_node(&self) -> &CommitNode {
        &self.graph[self.head]
    }

    pub fn node(&self, idx: NodeIndex) -> &CommitNode {
        &self.graph[idx]
    }

    pub fn index_of(&self, hash: &str) -> Option<NodeIndex> {
        self.index.get(hash).copied()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains_key(hash)
    }

    /// Parents of a node in their original order.
    pub fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges(idx)
            .map(|e| (e.weight().ordinal, e.target()))
            .collect();
        edges.sort_by_key(|(ordinal, _)| *ordinal);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CommitNode> {
        self.graph.node_weights()
    }

    /// Hashes of every commit reachable from the head (head included).
    pub fn reachable(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    /// Canonical form of the graph: hash -> ordered parent hashes.
    /// Two graphs with the same structure compare equal regardless of build order.
    pub fn structure(&self) -> BTreeMap<String, Vec<String>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let parents = self
                    .parents(idx)
                    .into_iter()
                    .map(|p| self.graph[p].hash.clone())
                    .collect();
                (self.graph[idx].hash.clone(), parents)
            })
            .collect()
    }
}

fn node_for(commit: &Commit) -> CommitNode {
    CommitNode {
        hash: commit.hash.clone(),
        author: commit.author.clone(),
        committer: commit.committer.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::{commit, commit_map};

    #[test]
    fn test_linear_graph() {
        let commits = commit_map(vec![
            commit("a", &[], 0),
            commit("b", &["a"], 1),
            commit("c", &["b"], 2),
        ]);
        let graph = CommitGraph::build("c", &commits).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.head_node().hash, "c");
        let parents = graph.parents(graph.head());
        assert_eq!(parents.len(), 1);
        assert_eq!(graph.node(parents[0]).hash, "b");
    }

    #[test]
    fn test_diamond_has_single_ancestor_node() {
        // a <- b, a <- c, d merges b and c
        let commits = commit_map(vec![
            commit("a", &[], 0),
            commit("b", &["a"], 1),
            commit("c", &["a"], 2),
            commit("d", &["b", "c"], 3),
        ]);
        let graph = CommitGraph::build("d", &commits).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.nodes().filter(|n| n.hash == "a").count(), 1);

        let b = graph.index_of("b").unwrap();
        let c = graph.index_of("c").unwrap();
        assert_eq!(graph.parents(b), graph.parents(c));
    }

    #[test]
    fn test_parent_order_preserved() {
        let commits = commit_map(vec![
            commit("a", &[], 0),
            commit("b", &["a"], 1),
            commit("c", &["a"], 2),
            commit("m", &["c", "b"], 3),
        ]);
        let graph = CommitGraph::build("m", &commits).unwrap();
        let parents: Vec<_> = graph
            .parents(graph.head())
            .into_iter()
            .map(|p| graph.node(p).hash.clone())
            .collect();
        assert_eq!(parents, vec!["c", "b"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let commits = commit_map(vec![
            commit("a", &[], 0),
            commit("b", &["a"], 1),
            commit("c", &["a"], 2),
            commit("d", &["b", "c"], 3),
            commit("e", &["d", "c"], 4),
        ]);
        let first = CommitGraph::build("e", &commits).unwrap();
        let second = CommitGraph::build("e", &commits).unwrap();
        assert_eq!(first.structure(), second.structure());
    }

    #[test]
    fn test_missing_parent_propagates() {
        let commits = commit_map(vec![commit("b", &["ghost"], 1)]);
        let err = CommitGraph::build("b", &commits).unwrap_err();
        assert_eq!(err, HistoryError::UnknownCommit("ghost".to_string()));
    }

    #[test]
    fn test_deep_history_does_not_recurse() {
        let mut commits = vec![commit("c0", &[], 0)];
        for i in 1..20_000_i64 {
            let parent = format!("c{}", i - 1);
            commits.push(commit(&format!("c{i}"), &[parent.as_str()], i));
        }
        let commits = commit_map(commits);
        let graph = CommitGraph::build("c19999", &commits).unwrap();
        assert_eq!(graph.len(), 20_000);
    }
}
