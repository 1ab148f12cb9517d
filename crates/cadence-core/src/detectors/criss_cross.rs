use crate::error::DetectorError;
use crate::history::{short_hash, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Flags branch pairs with two or more merge bases, the trace left by
/// merging two branches into each other repeatedly.
pub struct CrissCrossMergeDetector;

impl Detector for CrissCrossMergeDetector {
    fn name(&self) -> &'static str {
        "criss-cross-merge"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let matrix = model.matrix();
        let mut violations = Vec::new();

        for (pair, bases) in matrix.pairs() {
            if bases.len() < 2 {
                continue;
            }

            // Attributed to whoever produced the most recent merge base.
            let latest = bases
                .iter()
                .filter_map(|hash| model.commit(hash))
                .max_by(|a, b| {
                    a.committer
                        .time
                        .cmp(&b.committer.time)
                        .then_with(|| a.hash.cmp(&b.hash))
                })
                .ok_or_else(|| {
                    DetectorError::malformed(
                        self.name(),
                        format!("merge bases of {}..{} are unknown", pair.first, pair.second),
                    )
                })?;

            let listed: Vec<&str> = bases.iter().map(|h| short_hash(h)).collect();
            violations.push(
                Violation::new(
                    ViolationKind::CrissCrossMerge {
                        first: pair.first.clone(),
                        second: pair.second.clone(),
                        merge_bases: bases.iter().cloned().collect(),
                    },
                    Severity::Violated,
                    format!(
                        "Branches '{}' and '{}' have {} merge bases ({})",
                        pair.first,
                        pair.second,
                        bases.len(),
                        listed.join(", ")
                    ),
                    latest.author.email.clone(),
                )
                .with_suggestion("Merge in one direction only, or rebase before merging back.")
                .at(latest.committer.time)
                .located(format!("{}..{}", pair.first, pair.second)),
            );
        }

        Ok(DetectorReport::new(violations.len(), matrix.len(), violations))
    }
}
