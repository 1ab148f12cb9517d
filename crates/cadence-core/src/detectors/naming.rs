use std::cmp::Ordering;

use crate::error::DetectorError;
use crate::history::{Branch, HistoryModel};
use crate::types::{Severity, Violation, ViolationKind};

use super::{Detector, DetectorReport};

/// Checks that branch names follow a shared convention.
///
/// Branches that share a convention (`feature/...`, `fix/...`) cluster in
/// edit-distance space. The most similar half of the branches defines the
/// expected substring; a branch that lacks it and is also dissimilar to the
/// rest is reported.
pub struct BranchNamingDetector {
    exempt: Vec<String>,
    similarity_factor: f64,
    min_substring_len: usize,
    separators: Vec<String>,
}

impl BranchNamingDetector {
    pub fn new(
        exempt: Vec<String>,
        similarity_factor: f64,
        min_substring_len: usize,
        separators: Vec<String>,
    ) -> Self {
        Self {
            exempt,
            similarity_factor,
            min_substring_len,
            separators,
        }
    }

    /// Cut the common substring after its last separator so the convention
    /// prefix (`feature/`) is reported rather than an incidental overlap.
    fn convention(&self, common: &str) -> Option<String> {
        let cut = self
            .separators
            .iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| common.rfind(s.as_str()).map(|i| i + s.len()))
            .max();
        let convention = match cut {
            Some(end) => &common[..end],
            None => common,
        };
        (convention.chars().count() >= self.min_substring_len).then(|| convention.to_string())
    }
}

impl Detector for BranchNamingDetector {
    fn name(&self) -> &'static str {
        "branch-naming"
    }

    fn run(&self, model: &HistoryModel) -> Result<DetectorReport, DetectorError> {
        let checked: Vec<&Branch> = model
            .branches()
            .iter()
            .filter(|b| !self.exempt.iter().any(|e| e == &b.name))
            .collect();
        let n = checked.len();
        if n < 2 {
            return Ok(DetectorReport::new(0, n, vec![]));
        }

        let scores: Vec<f64> = checked
            .iter()
            .enumerate()
            .map(|(i, a)| {
                checked
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, b)| similarity(&a.name, &b.name))
                    .sum()
            })
            .collect();

        let mut ranked: Vec<usize> = (0..n).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| checked[a].name.cmp(&checked[b].name))
        });
        let top: Vec<&str> = ranked
            .iter()
            .take((n / 2).max(2).min(n))
            .map(|&i| checked[i].name.as_str())
            .collect();

        let convention = self.convention(&longest_common_substring(&top));
        let threshold = self.similarity_factor * n as f64;

        let mut violations = Vec::new();
        for (branch, score) in checked.iter().zip(&scores) {
            if let Some(ref expected) = convention {
                if branch.name.contains(expected.as_str()) {
                    continue;
                }
            }
            if *score >= threshold {
                continue;
            }

            let head = branch.graph.head_node();
            let expected = convention.clone().unwrap_or_default();
            let message = match convention {
                Some(ref c) => format!(
                    "Branch '{}' does not follow the naming convention '{c}'",
                    branch.name
                ),
                None => format!(
                    "Branch '{}' is unlike every other branch name",
                    branch.name
                ),
            };
            violations.push(
                Violation::new(
                    ViolationKind::BranchNaming {
                        branch: branch.name.clone(),
                        expected,
                    },
                    Severity::Violated,
                    message,
                    head.author.email.clone(),
                )
                .with_suggestion("Name branches with the prefix the team agreed on.")
                .located(branch.name.clone()),
            );
        }

        Ok(DetectorReport::new(violations.len(), n, violations))
    }
}

/// Normalized Levenshtein similarity in `[0, 1]`; 1 means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Longest substring contained in every name. Ties resolve to the leftmost
/// occurrence in the shortest name.
pub fn longest_common_substring(names: &[&str]) -> String {
    let Some(shortest) = names.iter().min_by_key(|n| n.chars().count()) else {
        return String::new();
    };
    let bounds: Vec<usize> = shortest
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(shortest.len()))
        .collect();
    let chars = bounds.len() - 1;

    for len in (1..=chars).rev() {
        for start in 0..=chars - len {
            let candidate = &shortest[bounds[start]..bounds[start + len]];
            if names.iter().all(|n| n.contains(candidate)) {
                return candidate.to_string();
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::*;
    use crate::history::RawCommit;

    fn detector() -> BranchNamingDetector {
        BranchNamingDetector::new(
            vec!["main".to_string(), "master".to_string()],
            0.175,
            4,
            vec!["/".to_string()],
        )
    }

    fn branches_model(names: &[&str]) -> HistoryModel {
        let mut commits: Vec<RawCommit> = vec![raw_commit("root", &[], 0)];
        let mut branches = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let hash = format!("c{i}");
            commits.push(raw_commit(&hash, &["root"], i as i64 + 1));
            branches.push(branch(name, &hash));
        }
        model(commits, branches, vec![])
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("aaa", "bbb"), 0.0);
    }

    #[test]
    fn test_longest_common_substring() {
        assert_eq!(
            longest_common_substring(&["feature/login", "feature/logout"]),
            "feature/log"
        );
        assert_eq!(longest_common_substring(&["abc", "xyz"]), "");
        assert_eq!(longest_common_substring(&[]), "");
        assert_eq!(longest_common_substring(&["fix/ü-1", "fix/ü-2"]), "fix/ü-");
    }

    #[test]
    fn test_consistent_feature_branches() {
        let model = branches_model(&[
            "main",
            "feature/login",
            "feature/signup",
            "feature/logout",
        ]);
        let report = detector().run(&model).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.found, 0);
        assert!(report.violations.is_empty());
        assert_eq!(detector().convention("feature/log").as_deref(), Some("feature/"));
    }

    #[test]
    fn test_unrelated_names_are_flagged() {
        let model = branches_model(&["main", "aaa", "bbb", "ccc"]);
        let report = detector().run(&model).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.found, 3);
        assert!(report
            .violations
            .iter()
            .all(|v| matches!(&v.kind, ViolationKind::BranchNaming { expected, .. } if expected.is_empty())));
    }

    #[test]
    fn test_outlier_is_flagged() {
        let model = branches_model(&[
            "feature/login",
            "feature/signup",
            "feature/logout",
            "feature/search",
            "wip",
        ]);
        let report = detector().run(&model).unwrap();
        assert_eq!(report.found, 1);
        assert_eq!(
            report.violations[0].kind,
            ViolationKind::BranchNaming {
                branch: "wip".to_string(),
                expected: "feature/".to_string(),
            }
        );
    }

    #[test]
    fn test_short_common_substring_is_ignored() {
        assert_eq!(detector().convention("fix"), None);
        assert_eq!(detector().convention("ab/"), None);
        assert_eq!(detector().convention("team"), Some("team".to_string()));
    }

    #[test]
    fn test_single_branch_has_nothing_to_compare() {
        let model = branches_model(&["main", "feature/x"]);
        let report = detector().run(&model).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.found, 0);
    }
}
