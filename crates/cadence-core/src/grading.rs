//! Per-contributor grading.
//!
//! A [`Marker`] runs a bundle of detectors, attributes each violation to the
//! contributor who caused it and turns that contributor's violation density
//! into a grade from 0 (worst) to 3 (best).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detectors::{DetectorKind, DetectorSettings};
use crate::history::HistoryModel;
use crate::identity::IdentityResolver;
use crate::runner::{run_all, DetectorFailure};

/// Relevant activity per login, usually commit counts.
pub type Contributions = BTreeMap<String, usize>;

pub const MAX_GRADE: u8 = 3;

/// Maps a violation percentage to a grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradingAlgorithm {
    /// Bands at 20%, 40% and 60%.
    #[default]
    Fixed,
    /// Caller-chosen band edges, in percent.
    Thresholds { low: f64, mid: f64, high: f64 },
}

impl GradingAlgorithm {
    fn bands(&self) -> (f64, f64, f64) {
        match *self {
            GradingAlgorithm::Fixed => (20.0, 40.0, 60.0),
            GradingAlgorithm::Thresholds { low, mid, high } => (low, mid, high),
        }
    }

    /// Grade `violations` against `denominator`. A percentage strictly below
    /// `low` earns 3, below `mid` 2, below `high` 1, anything else 0.
    pub fn grade(&self, violations: usize, denominator: f64) -> u8 {
        let (low, mid, high) = self.bands();
        let percentage = percentage(violations, denominator);
        if percentage < low {
            3
        } else if percentage < mid {
            2
        } else if percentage < high {
            1
        } else {
            0
        }
    }
}

/// `violations / denominator × 100`, or 0 when the denominator is not positive.
pub fn percentage(violations: usize, denominator: f64) -> f64 {
    if denominator.is_nan() || denominator <= 0.0 {
        return 0.0;
    }
    let p = violations as f64 / denominator * 100.0;
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

/// A named bundle of detectors graded per contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub detectors: Vec<DetectorKind>,
    #[serde(default)]
    pub grading: GradingAlgorithm,
    /// Multiplies a contributor's contribution to form the denominator.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Contributors below this are not graded.
    #[serde(default = "default_min_contribution")]
    pub min_contribution: usize,
}

fn default_weight() -> f64 {
    1.0
}

fn default_min_contribution() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorGrade {
    pub login: String,
    pub marker: String,
    pub violations: usize,
    pub contribution: usize,
    pub denominator: f64,
    pub grade: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerRun {
    pub grades: Vec<ContributorGrade>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DetectorFailure>,
}

/// Resolve an email to a login, falling back to the lowercased email.
fn login_for(resolver: &dyn IdentityResolver, email: &str) -> String {
    match resolver.login_for_email(email) {
        Some(login) => login,
        None => {
            warn!(email, "no identity for email, grading it under the email itself");
            email.to_lowercase()
        }
    }
}

/// Run every marker and grade each contributor that either appears in
/// `contributions` or owns a violation.
pub fn run_markers(
    markers: &[Marker],
    model: &HistoryModel,
    settings: &DetectorSettings,
    resolver: &dyn IdentityResolver,
    contributions: &Contributions,
) -> MarkerRun {
    let mut run = MarkerRun::default();
    let mut logins: BTreeMap<String, String> = BTreeMap::new();

    for marker in markers {
        let (reports, failures) = run_all(&marker.detectors, model, settings);
        run.failures.extend(failures);

        let mut violations: BTreeMap<String, usize> = BTreeMap::new();
        for violation in reports.iter().flat_map(|r| &r.report.violations) {
            let login = logins
                .entry(violation.author_email.to_lowercase())
                .or_insert_with(|| login_for(resolver, &violation.author_email))
                .clone();
            *violations.entry(login).or_insert(0) += 1;
        }

        let contributors: BTreeSet<&String> =
            contributions.keys().chain(violations.keys()).collect();
        for login in contributors {
            let contribution = contributions.get(login).copied().unwrap_or(0);
            if contribution < marker.min_contribution {
                debug!(marker = %marker.name, login = %login, contribution, "below contribution floor");
                continue;
            }
            let count = violations.get(login).copied().unwrap_or(0);
            let denominator = contribution as f64 * marker.weight;
            run.grades.push(ContributorGrade {
                login: login.clone(),
                marker: marker.name.clone(),
                violations: count,
                contribution,
                denominator,
                grade: marker.grading.grade(count, denominator),
            });
        }
    }

    run.failures.sort();
    run.failures.dedup();
    run
}

/// Count non-merge commits per login.
pub fn contributions_from_commits(
    model: &HistoryModel,
    resolver: &dyn IdentityResolver,
) -> Contributions {
    let mut logins: BTreeMap<String, String> = BTreeMap::new();
    let mut contributions = Contributions::new();
    for commit in model.commits().into_iter().filter(|c| !c.is_merge()) {
        let email = &commit.author.email;
        let login = logins
            .entry(email.to_lowercase())
            .or_insert_with(|| login_for(resolver, email))
            .clone();
        *contributions.entry(login).or_insert(0) += 1;
    }
    contributions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::*;
    use crate::history::RawCommit;
    use crate::identity::IdentityTable;

    #[test]
    fn test_fixed_bands() {
        let fixed = GradingAlgorithm::Fixed;
        assert_eq!(fixed.grade(19, 100.0), 3);
        assert_eq!(fixed.grade(21, 100.0), 2);
        assert_eq!(fixed.grade(41, 100.0), 1);
        assert_eq!(fixed.grade(61, 100.0), 0);
        assert_eq!(fixed.grade(0, 100.0), MAX_GRADE);
    }

    #[test]
    fn test_band_edges_fall_into_lower_grade() {
        let fixed = GradingAlgorithm::Fixed;
        assert_eq!(fixed.grade(20, 100.0), 2);
        assert_eq!(fixed.grade(40, 100.0), 1);
        assert_eq!(fixed.grade(60, 100.0), 0);
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = GradingAlgorithm::Thresholds {
            low: 5.0,
            mid: 10.0,
            high: 15.0,
        };
        assert_eq!(strict.grade(4, 100.0), 3);
        assert_eq!(strict.grade(7, 100.0), 2);
        assert_eq!(strict.grade(12, 100.0), 1);
        assert_eq!(strict.grade(50, 100.0), 0);
    }

    #[test]
    fn test_degenerate_denominator() {
        assert_eq!(percentage(5, 0.0), 0.0);
        assert_eq!(percentage(5, -2.0), 0.0);
        assert_eq!(percentage(5, f64::NAN), 0.0);
        assert_eq!(GradingAlgorithm::Fixed.grade(5, 0.0), 3);
    }

    #[test]
    fn test_grading_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            grading: GradingAlgorithm,
        }
        let w: Wrapper = toml::from_str(r#"grading = "fixed""#).unwrap();
        assert_eq!(w.grading, GradingAlgorithm::Fixed);
        let w: Wrapper =
            toml::from_str("grading = { thresholds = { low = 1.0, mid = 2.0, high = 3.0 } }")
                .unwrap();
        assert_eq!(
            w.grading,
            GradingAlgorithm::Thresholds {
                low: 1.0,
                mid: 2.0,
                high: 3.0
            }
        );
    }

    fn authored(mut commit: RawCommit, email: &str, message: &str) -> RawCommit {
        commit.author.email = email.to_string();
        commit.committer.email = email.to_string();
        commit.message = message.to_string();
        commit
    }

    fn team_model() -> HistoryModel {
        model(
            vec![
                authored(raw_commit("a1", &[], 0), "alice@example.com", "wip"),
                authored(raw_commit("a2", &["a1"], 1), "alice@example.com", "Add login form"),
                authored(raw_commit("a3", &["a2"], 2), "Alice@Work.example", "Add logout"),
                authored(raw_commit("a4", &["a3"], 3), "alice@example.com", "Wire sessions"),
                authored(raw_commit("b1", &["a4"], 4), "bob@example.com", "fix"),
                authored(raw_commit("b2", &["b1"], 5), "bob@example.com", "update"),
                authored(raw_commit("c1", &["b2"], 6), "carol@example.com", "wip"),
            ],
            vec![branch("main", "c1")],
            vec![],
        )
    }

    fn identities() -> IdentityTable {
        let mut table = IdentityTable::default();
        table.insert("alice", "alice@example.com");
        table.insert("alice", "alice@work.example");
        table.insert("bob", "bob@example.com");
        table
    }

    fn messages_marker(min_contribution: usize) -> Marker {
        Marker {
            name: "messages".to_string(),
            detectors: vec![DetectorKind::NonDescriptiveMessage],
            grading: GradingAlgorithm::Fixed,
            weight: 1.0,
            min_contribution,
        }
    }

    #[test]
    fn test_contributions_resolve_identities() {
        let contributions = contributions_from_commits(&team_model(), &identities());
        assert_eq!(contributions["alice"], 4);
        assert_eq!(contributions["bob"], 2);
        assert_eq!(contributions["carol@example.com"], 1);
    }

    #[test]
    fn test_unresolved_email_casing_is_one_login() {
        let model = model(
            vec![
                authored(raw_commit("c1", &[], 0), "Carol@Example.com", "Tidy parser errors"),
                authored(raw_commit("c2", &["c1"], 1), "carol@example.com", "wip"),
            ],
            vec![branch("main", "c2")],
            vec![],
        );
        let ids = IdentityTable::default();
        let contributions = contributions_from_commits(&model, &ids);
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions["carol@example.com"], 2);

        let run = run_markers(
            &[messages_marker(1)],
            &model,
            &DetectorSettings::default(),
            &ids,
            &contributions,
        );
        assert_eq!(run.grades.len(), 1);
        let carol = &run.grades[0];
        assert_eq!(carol.login, "carol@example.com");
        assert_eq!(carol.violations, 1);
        assert_eq!(carol.contribution, 2);
        // 1 of 2 is 50%
        assert_eq!(carol.grade, 1);
    }

    #[test]
    fn test_grades_per_contributor() {
        let model = team_model();
        let ids = identities();
        let contributions = contributions_from_commits(&model, &ids);
        let run = run_markers(
            &[messages_marker(1)],
            &model,
            &DetectorSettings::default(),
            &ids,
            &contributions,
        );
        assert!(run.failures.is_empty());

        let grade = |login: &str| {
            run.grades
                .iter()
                .find(|g| g.login == login)
                .unwrap_or_else(|| panic!("no grade for {login}"))
        };
        // 1 of 4 is 25%
        assert_eq!(grade("alice").violations, 1);
        assert_eq!(grade("alice").grade, 2);
        // 2 of 2 is 100%
        assert_eq!(grade("bob").grade, 0);
        assert_eq!(grade("carol@example.com").grade, 0);
    }

    #[test]
    fn test_contribution_floor_excludes() {
        let model = team_model();
        let ids = identities();
        let contributions = contributions_from_commits(&model, &ids);
        let run = run_markers(
            &[messages_marker(3)],
            &model,
            &DetectorSettings::default(),
            &ids,
            &contributions,
        );
        let logins: Vec<&str> = run.grades.iter().map(|g| g.login.as_str()).collect();
        assert_eq!(logins, vec!["alice"]);
    }

    #[test]
    fn test_marker_weight_scales_denominator() {
        let model = team_model();
        let ids = identities();
        let contributions = contributions_from_commits(&model, &ids);
        let mut marker = messages_marker(1);
        marker.weight = 4.0;
        let run = run_markers(&[marker], &model, &DetectorSettings::default(), &ids, &contributions);
        let bob = run.grades.iter().find(|g| g.login == "bob").unwrap();
        assert_eq!(bob.denominator, 8.0);
        // 2 of 8 is 25%
        assert_eq!(bob.grade, 2);
    }

    #[test]
    fn test_failures_recorded() {
        let model = team_model();
        let ids = identities();
        let mut marker = messages_marker(1);
        marker.detectors.push(DetectorKind::CherryPickRelease);
        let run = run_markers(
            &[marker],
            &model,
            &DetectorSettings::default(),
            &ids,
            &contributions_from_commits(&model, &ids),
        );
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.grades.len(), 3);
    }
}
