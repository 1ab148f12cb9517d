use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::graph::CommitLookup;
use crate::history::Branch;

/// Computes the merge base(s) of two commits. Usually backed by the VCS.
pub trait MergeBaseProvider {
    fn merge_bases(&self, first: &str, second: &str) -> Result<Vec<String>, HistoryError>;
}

/// Merge-base provider that walks the in-memory commit DAG.
///
/// Returns every lowest common ancestor: common ancestors that are not
/// themselves an ancestor of another common ancestor.
pub struct DagMergeBases<'a> {
    lookup: &'a dyn CommitLookup,
}

impl<'a> DagMergeBases<'a> {
    pub fn new(lookup: &'a dyn CommitLookup) -> Self {
        Self { lookup }
    }

    fn ancestors(&self, head: &str) -> Result<HashSet<String>, HistoryError> {
        let mut seen = HashSet::new();
        let mut work = vec![head.to_string()];
        while let Some(hash) = work.pop() {
            if !seen.insert(hash.clone()) {
                continue;
            }
            let commit = self.lookup.lookup(&hash)?;
            work.extend(commit.parents.iter().cloned());
        }
        Ok(seen)
    }
}

impl MergeBaseProvider for DagMergeBases<'_> {
    fn merge_bases(&self, first: &str, second: &str) -> Result<Vec<String>, HistoryError> {
        let left = self.ancestors(first)?;
        let right = self.ancestors(second)?;
        let common: HashSet<&String> = left.intersection(&right).collect();

        // Every proper ancestor of a common ancestor is dominated.
        let mut dominated: HashSet<String> = HashSet::new();
        for hash in &common {
            let commit = self.lookup.lookup(hash)?;
            let mut work: Vec<String> = commit.parents.clone();
            while let Some(parent) = work.pop() {
                if !dominated.insert(parent.clone()) {
                    continue;
                }
                work.extend(self.lookup.lookup(&parent)?.parents.iter().cloned());
            }
        }

        let mut bases: Vec<String> = common
            .into_iter()
            .filter(|h| !dominated.contains(*h))
            .cloned()
            .collect();
        bases.sort();
        Ok(bases)
    }
}

/// Unordered pair of branch names, stored with `first <= second`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchPair {
    pub first: String,
    pub second: String,
}

impl BranchPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

/// Merge bases for every unordered pair of distinct branches.
#[derive(Debug, Clone, Default)]
pub struct BranchMatrix {
    entries: BTreeMap<BranchPair, BTreeSet<String>>,
}

impl BranchMatrix {
    /// O(n^2) merge-base lookups over the given branches.
    pub fn build(
        branches: &[Branch],
        provider: &dyn MergeBaseProvider,
    ) -> Result<Self, HistoryError> {
        let mut entries = BTreeMap::new();
        for (i, a) in branches.iter().enumerate() {
            for b in &branches[i + 1..] {
                if a.name == b.name {
                    continue;
                }
                let pair = BranchPair::new(&a.name, &b.name);
                let (first_head, second_head) = if pair.first == a.name {
                    (&a.head, &b.head)
                } else {
                    (&b.head, &a.head)
                };
                let bases = provider
                    .merge_bases(first_head, second_head)
                    .map_err(|e| match e {
                        HistoryError::MergeBase { .. } => e,
                        other => HistoryError::MergeBase {
                            first: pair.first.clone(),
                            second: pair.second.clone(),
                            reason: other.to_string(),
                        },
                    })?;
                entries.insert(pair, bases.into_iter().collect());
            }
        }
        Ok(Self { entries })
    }

    /// Merge bases of two branches, independent of argument order.
    pub fn merge_bases(&self, a: &str, b: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(&BranchPair::new(a, b))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&BranchPair, &BTreeSet<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
