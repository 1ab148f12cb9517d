pub mod analysis;
pub mod config;
pub mod detectors;
pub mod diff;
pub mod error;
pub mod grading;
pub mod graph;
pub mod history;
pub mod identity;
pub mod matrix;
pub mod runner;
pub mod types;

pub use analysis::{analyze, AnalysisReport, HistorySummary};
pub use config::Config;
pub use detectors::{Detector, DetectorKind, DetectorReport, DetectorSettings};
pub use error::{DetectorError, HistoryError};
pub use grading::{
    contributions_from_commits, run_markers, ContributorGrade, Contributions, GradingAlgorithm,
    Marker, MarkerRun,
};
pub use graph::CommitGraph;
pub use history::{build_history_model, build_history_model_with, HistoryModel, RawHistory};
pub use identity::{IdentityResolver, IdentityTable};
pub use matrix::{BranchMatrix, DagMergeBases, MergeBaseProvider};
pub use runner::{run_rule, run_rules, DetectorFailure, Rule, RuleOutcome, Scoreboard, Workflow};
pub use types::*;
