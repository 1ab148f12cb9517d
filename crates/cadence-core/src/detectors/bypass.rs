use petgraph::graph::NodeIndex;

use crate::error::DetectorError;
use crate::graph::CommitGraph;
use crate::history::{short_hash, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Flags commits that landed on the primary branch without going through a merge.
pub struct FeatureBranchBypassDetector {
    primary: String,
}

impl FeatureBranchBypassDetector {
    pub fn new(primary: String) -> Self {
        Self { primary }
    }
}

/// Stretch of single-parent commits from a start node down to the next merge
/// or the root.
struct Segment {
    /// Merge commit that ends the stretch; `None` when the root was reached.
    end: Option<NodeIndex>,
    /// Direct commits in the stretch. Always empty when `end` is `None`.
    pending: Vec<NodeIndex>,
    steps: usize,
}

/// Walk down from `start` until a merge commit or the root. Commits at the
/// very start of a project cannot bypass anything, so reaching the root
/// discards what was collected.
fn check_end(graph: &CommitGraph, start: NodeIndex) -> Segment {
    let mut node = start;
    let mut pending = Vec::new();
    let mut steps = 0;
    loop {
        let parents = graph.parents(node);
        match parents.as_slice() {
            [] => {
                return Segment {
                    end: None,
                    pending: Vec::new(),
                    steps: steps + 1,
                }
            }
            [parent] => {
                pending.push(node);
                steps += 1;
                node = *parent;
            }
            _ => {
                return Segment {
                    end: Some(node),
                    pending,
                    steps,
                }
            }
        }
    }
}

/// Returns the bypassing commits and the number of commits examined.
///
/// At every merge, each parent side is scanned to its next merge; the side
/// with the fewest steps is followed as the primary line (ties: fewer
/// violations, then parent order) and the other sides are treated as the
/// merged-in feature branches.
pub(crate) fn bypassing_commits(graph: &CommitGraph) -> (Vec<NodeIndex>, usize) {
    let mut segment = check_end(graph, graph.head());
    let mut violations = std::mem::take(&mut segment.pending);
    let mut examined = segment.steps;

    while let Some(merge) = segment.end {
        examined += 1;
        let Some(mut next) = graph
            .parents(merge)
            .into_iter()
            .map(|p| check_end(graph, p))
            .min_by_key(|s| (s.steps, s.pending.len()))
        else {
            break;
        };
        violations.append(&mut next.pending);
        examined += next.steps;
        segment = next;
    }

    (violations, examined)
}

impl Detector for FeatureBranchBypassDetector {
    fn name(&self) -> &'static str {
        "feature-branch-bypass"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let branch = model
            .branch(&self.primary)
            .ok_or_else(|| DetectorError::missing_branch(self.name(), &self.primary))?;
        let graph = &branch.graph;

        let (nodes, examined) = bypassing_commits(graph);
        let violations: Vec<Violation> = nodes
            .into_iter()
            .map(|idx| {
                let node = graph.node(idx);
                Violation::new(
                    ViolationKind::FeatureBranchBypass {
                        commit: node.hash.clone(),
                    },
                    Severity::Violated,
                    format!(
                        "Commit {} landed directly on '{}' outside a merge",
                        short_hash(&node.hash),
                        self.primary
                    ),
                    node.author.email.clone(),
                )
                .with_suggestion("Commit on a feature branch and merge it through review.")
                .at(node.committer.time)
                .located(node.hash.clone())
            })
            .collect();

        Ok(DetectorReport::new(violations.len(), examined, violations))
    }
}
