//! Analytic Hierarchy Process: from pairwise judgments to validated weights.
//!
//! Pipeline for one session:
//! - [`ComparisonMatrix::build`] turns a complete set of judgments into a
//!   reciprocal matrix
//! - [`solve`] derives the priority vector and `lambda_max`
//! - [`check`] computes Saaty's consistency ratio
//! - [`aggregate`] combines several stakeholders at the matrix level

pub mod aggregate;
pub mod consistency;
pub mod matrix;
pub mod solver;

use thiserror::Error;

pub use aggregate::{
    aggregate, aggregate_matrices, AggregationResult, StakeholderDiagnostics,
    StakeholderSubmission,
};
pub use consistency::{
    check, most_inconsistent_judgments, random_index, ConsistencyConfig, ConsistencyResult,
    JudgmentDeviation, ACCEPTABLE_CONSISTENCY_RATIO, RANDOM_INDEX,
};
pub use matrix::{ComparisonMatrix, PairwiseJudgment, SAATY_MAX, SAATY_MIN};
pub use solver::{solve, PriorityVector, SolverConfig, WeightSolution};

#[derive(Debug, Error, PartialEq)]
pub enum AhpError {
    #[error("at least one criterion is required")]
    EmptyCriteria,
    #[error("duplicate criterion id: {criterion_id}")]
    DuplicateCriterion { criterion_id: String },
    #[error("unknown criterion id referenced by judgment: {criterion_id}")]
    UnknownCriterion { criterion_id: String },
    #[error("criterion {criterion_id} cannot be compared with itself")]
    SelfComparison { criterion_id: String },
    #[error("pair ({criterion_a_id}, {criterion_b_id}) was judged more than once")]
    DuplicateJudgment {
        criterion_a_id: String,
        criterion_b_id: String,
    },
    #[error(
        "incomplete comparisons: {} missing pair(s): {}",
        .missing.len(),
        format_pairs(.missing)
    )]
    IncompleteComparison { missing: Vec<(String, String)> },
    #[error(
        "judgment ({criterion_a_id}, {criterion_b_id}) = {value} is outside the Saaty scale [1/9, 9]"
    )]
    InvalidJudgment {
        criterion_a_id: String,
        criterion_b_id: String,
        value: f64,
    },
    #[error("matrix is not reciprocal at ({row}, {col}): got {value}, expected {expected}")]
    NonReciprocal {
        row: usize,
        col: usize,
        value: f64,
        expected: f64,
    },
    #[error("matrix shape mismatch: expected {expected}x{expected}, {detail}")]
    MatrixShape { expected: usize, detail: String },
    #[error("numerical instability while deriving weights: {reason}")]
    NumericalInstability { reason: String },
    #[error("aggregation requires at least one stakeholder submission")]
    NoSubmissions,
    #[error("submission {stakeholder_id} uses criteria {got:?}, expected {expected:?}")]
    CriteriaMismatch {
        stakeholder_id: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("duplicate stakeholder id: {stakeholder_id}")]
    DuplicateStakeholder { stakeholder_id: String },
    #[error("no weight supplied for role {role}")]
    MissingRoleWeight { role: String },
    #[error("invalid weight for role {role}: {weight}")]
    InvalidRoleWeight { role: String, weight: f64 },
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(a, b)| format!("({a}, {b})"))
        .collect::<Vec<_>>()
        .join(", ")
}
