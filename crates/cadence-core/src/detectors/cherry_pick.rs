use std::collections::{BTreeMap, HashSet};

use crate::error::DetectorError;
use crate::history::{Commit, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Finds the same change landing under more than one commit hash.
pub struct CherryPickDetector;

impl Detector for CherryPickDetector {
    fn name(&self) -> &'static str {
        "cherry-pick"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let commits = model.commits();
        let groups = group_by_patch_id(commits.iter().copied());
        let total = groups.values().map(Vec::len).sum();

        let mut found = 0;
        let mut violations = Vec::new();
        for (patch_id, group) in &groups {
            let Some((original, copies)) = group.split_first() else {
                continue;
            };
            found += copies.len();
            for copy in copies {
                violations.push(
                    Violation::new(
                        ViolationKind::CherryPick {
                            commit: copy.hash.clone(),
                            original: original.hash.clone(),
                            patch_id: patch_id.to_string(),
                        },
                        Severity::Violated,
                        format!(
                            "Commit {} repeats the change of {}",
                            copy.short_hash(),
                            original.short_hash()
                        ),
                        copy.author.email.clone(),
                    )
                    .with_suggestion(
                        "Merge the branch carrying the change instead of cherry-picking it.",
                    )
                    .at(copy.committer.time)
                    .located(copy.hash.clone()),
                );
            }
        }

        Ok(DetectorReport::new(found, total, violations))
    }
}

/// Finds release-branch commits whose change was cherry-picked from the main line.
pub struct ReleaseCherryPickDetector {
    main: String,
    release: String,
}

impl ReleaseCherryPickDetector {
    pub fn new(main: String, release: String) -> Self {
        Self { main, release }
    }
}

impl Detector for ReleaseCherryPickDetector {
    fn name(&self) -> &'static str {
        "cherry-pick-release"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let main = model
            .branch(&self.main)
            .ok_or_else(|| DetectorError::missing_branch(self.name(), &self.main))?;
        let release = model
            .branch(&self.release)
            .ok_or_else(|| DetectorError::missing_branch(self.name(), &self.release))?;

        let main_set = main.graph.reachable();
        let release_set = release.graph.reachable();

        let mut release_commits = Vec::with_capacity(release_set.len());
        for hash in &release_set {
            let commit = model.commit(hash).ok_or_else(|| {
                DetectorError::malformed(self.name(), format!("graph node {hash} has no commit"))
            })?;
            release_commits.push(commit);
        }
        release_commits.sort_by(|a, b| {
            a.committer
                .time
                .cmp(&b.committer.time)
                .then_with(|| a.hash.cmp(&b.hash))
        });

        let candidates = main_set
            .union(&release_set)
            .filter_map(|hash| model.commit(hash));
        let duplicates = group_by_patch_id(candidates);
        let cherry_picked: HashSet<&str> = duplicates
            .iter()
            .filter(|(_, group)| group.len() > 1)
            .filter(|(_, group)| group.iter().any(|c| main_set.contains(&c.hash)))
            .map(|(patch_id, _)| *patch_id)
            .collect();

        let total = release_commits.len();
        let mut violations = Vec::new();
        for commit in release_commits {
            let Some(patch_id) = commit.patch_id.as_deref() else {
                continue;
            };
            if !cherry_picked.contains(patch_id) {
                continue;
            }
            violations.push(
                Violation::new(
                    ViolationKind::ReleaseCherryPick {
                        commit: commit.hash.clone(),
                        patch_id: patch_id.to_string(),
                    },
                    Severity::Violated,
                    format!(
                        "Commit {} on '{}' was cherry-picked from '{}'",
                        commit.short_hash(),
                        self.release,
                        self.main
                    ),
                    commit.author.email.clone(),
                )
                .with_suggestion("Fix on the release branch and merge it back instead.")
                .at(commit.committer.time)
                .located(commit.hash.clone()),
            );
        }

        Ok(DetectorReport::new(violations.len(), total, violations))
    }
}

/// Group commits carrying a patch id by that id, earliest commit first.
fn group_by_patch_id<'a>(
    commits: impl Iterator<Item = &'a Commit>,
) -> BTreeMap<&'a str, Vec<&'a Commit>> {
    let mut groups: BTreeMap<&str, Vec<&Commit>> = BTreeMap::new();
    for commit in commits {
        if let Some(patch_id) = commit.patch_id.as_deref() {
            groups.entry(patch_id).or_default().push(commit);
        }
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            a.committer
                .time
                .cmp(&b.committer.time)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        group.dedup_by(|a, b| a.hash == b.hash);
    }
    groups
}
