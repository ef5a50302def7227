//! Multi-stakeholder aggregation at the matrix level.
//!
//! Cells are combined with a role-weighted geometric mean, which keeps the
//! aggregate reciprocal: `gm(1/x) = 1/gm(x)`. Averaging the stakeholders'
//! weight vectors instead would not.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::consistency::{check, ConsistencyConfig, ConsistencyResult};
use super::matrix::{ComparisonMatrix, PairwiseJudgment};
use super::solver::{solve, PriorityVector, SolverConfig, WeightSolution};
use super::AhpError;
use crate::criteria::Criterion;

/// One stakeholder's completed comparison set. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderSubmission {
    pub stakeholder_id: String,
    pub role: String,
    pub comparison_matrix: ComparisonMatrix,
}

impl StakeholderSubmission {
    pub fn new(
        stakeholder_id: impl Into<String>,
        role: impl Into<String>,
        comparison_matrix: ComparisonMatrix,
    ) -> Self {
        Self {
            stakeholder_id: stakeholder_id.into(),
            role: role.into(),
            comparison_matrix,
        }
    }

    pub fn from_judgments(
        stakeholder_id: impl Into<String>,
        role: impl Into<String>,
        criteria: &[Criterion],
        judgments: &[PairwiseJudgment],
    ) -> Result<Self, AhpError> {
        let comparison_matrix = ComparisonMatrix::build(criteria, judgments)?;
        Ok(Self::new(stakeholder_id, role, comparison_matrix))
    }
}

/// Per-stakeholder view used to spot outliers without dropping their input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderDiagnostics {
    pub stakeholder_id: String,
    pub role: String,
    pub role_weight: f64,
    pub priorities: PriorityVector,
    pub consistency: ConsistencyResult,
    pub solver_converged: bool,
    /// L1 distance between this stakeholder's priorities and the consensus.
    pub distance_from_consensus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub aggregate_matrix: ComparisonMatrix,
    pub consensus: WeightSolution,
    pub consistency: ConsistencyResult,
    /// In submission order.
    pub per_stakeholder: Vec<ConsistencyResult>,
    pub diagnostics: Vec<StakeholderDiagnostics>,
}

fn resolve_role_weights(
    submissions: &[StakeholderSubmission],
    weights_by_role: Option<&HashMap<String, f64>>,
) -> Result<Vec<f64>, AhpError> {
    let Some(map) = weights_by_role else {
        return Ok(vec![1.0; submissions.len()]);
    };
    submissions
        .iter()
        .map(|s| {
            let w = *map.get(&s.role).ok_or_else(|| AhpError::MissingRoleWeight {
                role: s.role.clone(),
            })?;
            if !w.is_finite() || w <= 0.0 {
                return Err(AhpError::InvalidRoleWeight {
                    role: s.role.clone(),
                    weight: w,
                });
            }
            Ok(w)
        })
        .collect()
}

fn validate_submissions(submissions: &[StakeholderSubmission]) -> Result<(), AhpError> {
    let first = submissions.first().ok_or(AhpError::NoSubmissions)?;
    let expected = first.comparison_matrix.criterion_ids();
    let mut seen = HashSet::with_capacity(submissions.len());
    for s in submissions {
        if !seen.insert(s.stakeholder_id.as_str()) {
            return Err(AhpError::DuplicateStakeholder {
                stakeholder_id: s.stakeholder_id.clone(),
            });
        }
        if s.comparison_matrix.criterion_ids() != expected {
            return Err(AhpError::CriteriaMismatch {
                stakeholder_id: s.stakeholder_id.clone(),
                expected: expected.to_vec(),
                got: s.comparison_matrix.criterion_ids().to_vec(),
            });
        }
    }
    Ok(())
}

/// Combine submissions into one reciprocal matrix.
///
/// `weights_by_role = None` weighs every stakeholder equally. A single
/// submission yields its own matrix unchanged.
pub fn aggregate_matrices(
    submissions: &[StakeholderSubmission],
    weights_by_role: Option<&HashMap<String, f64>>,
) -> Result<ComparisonMatrix, AhpError> {
    validate_submissions(submissions)?;
    let role_weights = resolve_role_weights(submissions, weights_by_role)?;

    if let [only] = submissions {
        return Ok(only.comparison_matrix.clone());
    }

    let total: f64 = role_weights.iter().sum();
    let ids = submissions[0].comparison_matrix.criterion_ids().to_vec();
    Ok(ComparisonMatrix::from_upper(ids, |i, k| {
        let log_sum: f64 = submissions
            .iter()
            .zip(&role_weights)
            .map(|(s, w)| w * s.comparison_matrix.get(i, k).ln())
            .sum();
        (log_sum / total).exp()
    }))
}

/// Derive consensus weights from all submissions.
pub fn aggregate(
    submissions: &[StakeholderSubmission],
    weights_by_role: Option<&HashMap<String, f64>>,
    solver_cfg: &SolverConfig,
    consistency_cfg: &ConsistencyConfig,
) -> Result<AggregationResult, AhpError> {
    let aggregate_matrix = aggregate_matrices(submissions, weights_by_role)?;
    let role_weights = resolve_role_weights(submissions, weights_by_role)?;
    let n = aggregate_matrix.size();

    let consensus = solve(&aggregate_matrix, solver_cfg)?;
    let consistency = check(consensus.lambda_max, n, consistency_cfg);

    let mut per_stakeholder = Vec::with_capacity(submissions.len());
    let mut diagnostics = Vec::with_capacity(submissions.len());
    for (s, role_weight) in submissions.iter().zip(role_weights) {
        let own = solve(&s.comparison_matrix, solver_cfg)?;
        let own_consistency = check(own.lambda_max, n, consistency_cfg);
        per_stakeholder.push(own_consistency.clone());
        diagnostics.push(StakeholderDiagnostics {
            stakeholder_id: s.stakeholder_id.clone(),
            role: s.role.clone(),
            role_weight,
            distance_from_consensus: own.priorities.l1_distance(&consensus.priorities),
            priorities: own.priorities,
            consistency: own_consistency,
            solver_converged: own.converged,
        });
    }

    debug!(
        stakeholders = submissions.len(),
        n,
        consensus_cr = consistency.consistency_ratio,
        "aggregated stakeholder judgments"
    );

    Ok(AggregationResult {
        aggregate_matrix,
        consensus,
        consistency,
        per_stakeholder,
        diagnostics,
    })
}
