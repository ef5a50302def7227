//! Composite multi-criteria scoring of work items.

pub mod composite;
pub mod normalize;

use thiserror::Error;

pub use composite::{score, score_batch, QvfScoreResult, ScoreBatch};
pub use normalize::{normalize, normalize_items, NormalizedCriterion, WorkItemCriteriaValues};

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("non-finite value {value} for criterion {criterion_id} at item position {position}")]
    NonFiniteValue {
        criterion_id: String,
        position: usize,
        value: f64,
    },
    #[error("weights are aligned with {got:?}, criteria are {expected:?}")]
    WeightCriteriaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("invalid weight for criterion {criterion_id}: {weight}")]
    InvalidWeight { criterion_id: String, weight: f64 },
    #[error("weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },
    #[error("duplicate item id: {item_id}")]
    DuplicateItem { item_id: String },
}
