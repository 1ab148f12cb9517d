use crate::error::DetectorError;
use crate::history::HistoryModel;
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Flags branches whose head has not moved for `stale_after_days`, measured
/// from the most recent commit in the snapshot rather than the wall clock.
pub struct StaleBranchDetector {
    exempt: Vec<String>,
    stale_after_days: i64,
}

impl StaleBranchDetector {
    pub fn new(exempt: Vec<String>, stale_after_days: i64) -> Self {
        Self {
            exempt,
            stale_after_days,
        }
    }
}

impl Detector for StaleBranchDetector {
    fn name(&self) -> &'static str {
        "stale-branch"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let Some(reference) = model.latest_activity() else {
            return Ok(DetectorReport::default());
        };

        let mut total = 0;
        let mut violations = Vec::new();
        for branch in model.branches() {
            if self.exempt.iter().any(|e| e == &branch.name) {
                continue;
            }
            total += 1;

            let head = branch.graph.head_node();
            let days_inactive = (reference - head.committer.time).num_days();
            if days_inactive > self.stale_after_days {
                violations.push(
                    Violation::new(
                        ViolationKind::StaleBranch {
                            branch: branch.name.clone(),
                            days_inactive,
                        },
                        Severity::Suggestion,
                        format!(
                            "Branch '{}' has had no commits for {days_inactive} days",
                            branch.name
                        ),
                        head.author.email.clone(),
                    )
                    .with_suggestion("Merge or delete branches once their work is finished.")
                    .at(head.committer.time)
                    .located(branch.name.clone()),
                );
            }
        }

        Ok(DetectorReport::new(violations.len(), total, violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::*;

    const DAY: i64 = 24 * 60;

    #[test]
    fn test_flags_only_old_non_exempt_branches() {
        let model = model(
            vec![
                raw_commit("root", &[], 0),
                raw_commit("old", &["root"], DAY),
                raw_commit("fresh", &["root"], 50 * DAY),
                raw_commit("tip", &["root"], 60 * DAY),
            ],
            vec![
                branch("main", "root"),
                branch("feature/old", "old"),
                branch("feature/fresh", "fresh"),
                branch("develop", "tip"),
            ],
            vec![],
        );

        let detector = StaleBranchDetector::new(vec!["main".to_string()], 30);
        let report = detector.run(&model).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.found, 1);
        assert_eq!(report.violated, 0, "staleness is only a suggestion");
        assert_eq!(
            report.violations[0].kind,
            ViolationKind::StaleBranch {
                branch: "feature/old".to_string(),
                days_inactive: 59,
            }
        );
    }

    #[test]
    fn test_empty_model() {
        let model = model(vec![], vec![], vec![]);
        let report = StaleBranchDetector::new(vec![], 30).run(&model).unwrap();
        assert_eq!(report, DetectorReport::default());
    }
}
