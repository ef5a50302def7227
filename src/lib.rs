#![forbid(unsafe_code)]

//! # qvf-core
//!
//! Turns stakeholder pairwise judgments into validated criterion weights
//! (Analytic Hierarchy Process) and ranks work items by a weighted composite
//! of heterogeneous, differently-scaled criteria (Quantified Value Framework).
//!
//! A run goes judgments → [`ahp::ComparisonMatrix`] → [`ahp::solve`] →
//! [`ahp::check`] → [`ahp::aggregate`] → [`scoring::score`]. The
//! [`session`] module wires those stages together behind a JSON-friendly
//! request/response pair.
//!
//! Everything here is a pure function of its inputs. Logging goes through
//! `tracing`; installing a subscriber is left to the caller.

pub mod ahp;
pub mod criteria;
pub mod scoring;
pub mod session;

pub use ahp::{
    AhpError, ComparisonMatrix, ConsistencyConfig, ConsistencyResult, PairwiseJudgment,
    PriorityVector, SolverConfig, StakeholderSubmission,
};
pub use criteria::{CriteriaConfig, CriteriaError, Criterion, CriterionCategory, Polarity};
pub use scoring::{QvfScoreResult, ScoringError, WorkItemCriteriaValues};
pub use session::{
    derive_weights, run, run_request, EngineConfig, QvfError, QvfRunOutput, QvfWarning,
    RunRequest, SessionDescriptor, WeightDerivation,
};
