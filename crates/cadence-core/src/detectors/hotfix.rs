use crate::error::DetectorError;
use crate::history::{HistoryModel, Tag};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Flags release tags created out of order: a tag that sorts before its
/// successor but points at a later commit was back-ported after the newer
/// version shipped.
pub struct HotfixDetector;

impl Detector for HotfixDetector {
    fn name(&self) -> &'static str {
        "hotfix"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let mut tags: Vec<&Tag> = model
            .tags()
            .iter()
            .filter(|t| t.name.starts_with('v'))
            .collect();
        // Lexicographic, not semantic-version order.
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        let violations: Vec<Violation> = tags
            .windows(2)
            .filter(|pair| pair[0].committer.time > pair[1].committer.time)
            .map(|pair| {
                let (tag, next) = (pair[0], pair[1]);
                Violation::new(
                    ViolationKind::Hotfix {
                        tag: tag.name.clone(),
                        next_tag: next.name.clone(),
                    },
                    Severity::Violated,
                    format!(
                        "Tag '{}' was created after '{}' although it is an earlier version",
                        tag.name, next.name
                    ),
                    tag.committer.email.clone(),
                )
                .with_suggestion("Fix on the main line first and release a new version.")
                .at(tag.committer.time)
                .located(tag.name.clone())
            })
            .collect();

        Ok(DetectorReport::new(violations.len(), tags.len(), violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::*;

    #[test]
    fn test_out_of_order_tag_is_hotfix() {
        let model = model(
            vec![
                raw_commit("t0", &[], 0),
                raw_commit("t1", &["t0"], 1),
                raw_commit("t2", &["t1"], 2),
            ],
            vec![],
            vec![
                tag("v1.0.2", "t1"),
                tag("v1.0.0", "t0"),
                tag("v1.0.1", "t2"),
            ],
        );
        let report = HotfixDetector.run(&model).unwrap();
        assert_eq!(report.found, 1);
        assert_eq!(report.total, 3);
        assert_eq!(
            report.violations[0].kind,
            ViolationKind::Hotfix {
                tag: "v1.0.1".to_string(),
                next_tag: "v1.0.2".to_string(),
            }
        );
    }

    #[test]
    fn test_tags_without_prefix_are_skipped() {
        let model = model(
            vec![raw_commit("t0", &[], 0), raw_commit("t1", &["t0"], 1)],
            vec![],
            vec![tag("1.0.0", "t1"), tag("release-2", "t0"), tag("v2.0.0", "t0")],
        );
        let report = HotfixDetector.run(&model).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.found, 0);
    }

    #[test]
    fn test_ordered_tags_are_clean() {
        let model = model(
            vec![raw_commit("t0", &[], 0), raw_commit("t1", &["t0"], 1)],
            vec![],
            vec![tag("v1.0.0", "t0"), tag("v1.1.0", "t1")],
        );
        let report = HotfixDetector.run(&model).unwrap();
        assert_eq!(report.found, 0);
        assert_eq!(report.total, 2);
    }
}
