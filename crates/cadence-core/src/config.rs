use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detectors::{DetectorKind, DetectorSettings};
use crate::grading::{GradingAlgorithm, Marker};
use crate::runner::{Rule, Weights, Workflow};

pub const CONFIG_FILE: &str = ".cadence.toml";

pub const TRUNK_BASED: &str = "trunk-based";
pub const FEATURE_BRANCH: &str = "feature-branch";
pub const GITFLOW: &str = "gitflow";

/// Top-level configuration from `.cadence.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub commits: CommitsConfig,
    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,
    #[serde(default = "default_markers")]
    pub markers: Vec<Marker>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branches: BranchesConfig::default(),
            naming: NamingConfig::default(),
            commits: CommitsConfig::default(),
            rules: default_rules(),
            markers: default_markers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchesConfig {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_release")]
    pub release: String,
    /// Long-lived branches left out of staleness and naming checks.
    #[serde(default = "default_exempt")]
    pub exempt: Vec<String>,
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
}

fn default_primary() -> String {
    "main".to_string()
}

fn default_release() -> String {
    "release".to_string()
}

fn default_exempt() -> Vec<String> {
    vec![
        "main".to_string(),
        "master".to_string(),
        "develop".to_string(),
        "HEAD".to_string(),
    ]
}

fn default_stale_after_days() -> i64 {
    90
}

impl Default for BranchesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            release: default_release(),
            exempt: default_exempt(),
            stale_after_days: default_stale_after_days(),
        }
    }
}

/// Branch-name consistency tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "default_similarity_factor")]
    pub similarity_factor: f64,
    #[serde(default = "default_min_substring_len")]
    pub min_substring_len: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_similarity_factor() -> f64 {
    0.175
}
fn default_min_substring_len() -> usize {
    4
}
fn default_separators() -> Vec<String> {
    vec!["/".to_string()]
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            similarity_factor: default_similarity_factor(),
            min_substring_len: default_min_substring_len(),
            separators: default_separators(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsConfig {
    #[serde(default = "default_min_message_length")]
    pub min_message_length: usize,
    /// Case-insensitive regular expressions matched against the whole summary.
    #[serde(default = "default_non_descriptive_patterns")]
    pub non_descriptive_patterns: Vec<String>,
    #[serde(default)]
    pub distance_threshold: Option<f64>,
}

fn default_min_message_length() -> usize {
    10
}

fn default_non_descriptive_patterns() -> Vec<String> {
    [
        "wip", "fix", "fixes", "update", "updates", "changes", "stuff", "misc", "tmp", "test",
        r"\.+", "asdf",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            min_message_length: default_min_message_length(),
            non_descriptive_patterns: default_non_descriptive_patterns(),
            distance_threshold: None,
        }
    }
}

fn weights(trunk: f64, feature: f64, gitflow: f64) -> Weights {
    [
        (TRUNK_BASED, trunk),
        (FEATURE_BRANCH, feature),
        (GITFLOW, gitflow),
    ]
    .into_iter()
    .map(|(w, weight)| (Workflow::new(w), Some(weight)))
    .collect()
}

/// One rule per detector, weighted by how much each workflow cares.
fn default_rules() -> Vec<Rule> {
    use DetectorKind::*;

    [
        (StaleBranch, weights(1.0, 0.5, 0.25)),
        (BranchNaming, weights(0.25, 1.0, 1.0)),
        (FeatureBranchBypass, weights(0.0, 1.0, 1.0)),
        (CherryPick, weights(1.0, 1.0, 0.5)),
        (CherryPickRelease, weights(0.0, 0.5, 1.0)),
        (CrissCrossMerge, weights(1.0, 0.5, 0.5)),
        (CommitDistance, weights(0.5, 0.5, 0.5)),
        (Hotfix, weights(0.5, 0.5, 1.0)),
        (EmptyCommit, weights(0.5, 0.5, 0.5)),
        (BinaryCommit, weights(0.25, 0.25, 0.25)),
        (ShortMessage, weights(0.5, 0.5, 0.5)),
        (NonDescriptiveMessage, weights(0.5, 0.5, 0.5)),
    ]
    .into_iter()
    .map(|(kind, weights)| Rule {
        name: kind.name().to_string(),
        detectors: vec![kind],
        weights,
    })
    .collect()
}

fn default_markers() -> Vec<Marker> {
    vec![
        Marker {
            name: "branching".to_string(),
            detectors: vec![
                DetectorKind::FeatureBranchBypass,
                DetectorKind::CherryPick,
                DetectorKind::CrissCrossMerge,
            ],
            grading: GradingAlgorithm::Fixed,
            weight: 1.0,
            min_contribution: 1,
        },
        Marker {
            name: "commit-quality".to_string(),
            detectors: vec![
                DetectorKind::EmptyCommit,
                DetectorKind::ShortMessage,
                DetectorKind::NonDescriptiveMessage,
            ],
            grading: GradingAlgorithm::Fixed,
            weight: 1.0,
            min_contribution: 1,
        },
    ]
}

impl Config {
    /// Load configuration from a `.cadence.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `cadence init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.cadence.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        for current in start.ancestors() {
            let config_path = current.join(CONFIG_FILE);
            if !config_path.exists() {
                continue;
            }
            return match Self::load(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        "failed to load config: {e:#}. Using defaults."
                    );
                    Self::default()
                }
            };
        }
        Self::default()
    }

    /// The slice of configuration handed to detectors.
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            primary_branch: self.branches.primary.clone(),
            release_branch: self.branches.release.clone(),
            exempt_branches: self.branches.exempt.clone(),
            stale_after_days: self.branches.stale_after_days,
            similarity_factor: self.naming.similarity_factor,
            min_substring_len: self.naming.min_substring_len,
            separators: self.naming.separators.clone(),
            min_message_length: self.commits.min_message_length,
            non_descriptive_patterns: self.commits.non_descriptive_patterns.clone(),
            distance_threshold: self.commits.distance_threshold,
        }
    }

    /// Generate default TOML content for `cadence init`.
    pub fn default_toml() -> String {
        r#"# Cadence - Workflow Analysis Configuration

[branches]
primary = "main"
# Required by the cherry-pick-release detector
release = "release"
# Left out of staleness and naming checks
exempt = ["main", "master", "develop", "HEAD"]
stale_after_days = 90

[naming]
similarity_factor = 0.175
# Common substrings shorter than this are not treated as a convention
min_substring_len = 4
separators = ["/"]

[commits]
min_message_length = 10
non_descriptive_patterns = ["wip", "fix", "fixes", "update", "updates", "changes", "stuff", "misc", "tmp", "test", '\.+', "asdf"]
# Suggest splitting commits whose distance exceeds this
# distance_threshold = 50.0

# Each rule runs its detectors and multiplies found/total by the weight of
# every target workflow. Omitted workflows weigh 0.
[[rules]]
name = "history"
detectors = ["feature-branch-bypass", "cherry-pick", "criss-cross-merge"]
weights = { trunk-based = 1.0, feature-branch = 1.0, gitflow = 0.5 }

[[rules]]
name = "branches"
detectors = ["stale-branch", "branch-naming"]
weights = { trunk-based = 1.0, feature-branch = 0.5, gitflow = 0.5 }

[[rules]]
name = "releases"
detectors = ["hotfix"]
weights = { trunk-based = 0.5, feature-branch = 0.5, gitflow = 1.0 }

[[rules]]
name = "commits"
detectors = ["empty-commit", "binary-commit", "short-message", "non-descriptive-message", "commit-distance"]
weights = { trunk-based = 0.5, feature-branch = 0.5, gitflow = 0.5 }

# Markers grade each contributor: violations / (contribution x weight)
# Grading: "fixed" (20/40/60%) or { thresholds = { low = 10.0, mid = 25.0, high = 50.0 } }
[[markers]]
name = "branching"
detectors = ["feature-branch-bypass", "cherry-pick", "criss-cross-merge"]
grading = "fixed"
weight = 1.0
min_contribution = 1

[[markers]]
name = "commit-quality"
detectors = ["empty-commit", "short-message", "non-descriptive-message"]
grading = "fixed"
weight = 1.0
min_contribution = 1
"#
        .to_string()
    }
}
