//! End-to-end prioritization runs.
//!
//! A run takes a session descriptor (criteria plus stakeholder judgments) and
//! a batch of work items, derives consensus weights once and scores every item
//! against them. Structural problems abort the run; everything advisory is
//! reported as a [`QvfWarning`] on the output.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ahp::{
    aggregate, check, AhpError, ComparisonMatrix, ConsistencyConfig, ConsistencyResult,
    PairwiseJudgment, PriorityVector, SolverConfig, StakeholderDiagnostics,
    StakeholderSubmission,
};
use crate::criteria::{CriteriaConfig, CriteriaError};
use crate::scoring::{score_batch, QvfScoreResult, ScoringError, WorkItemCriteriaValues};

/// Scope label used in warnings about the aggregated matrix.
pub const CONSENSUS_SCOPE: &str = "consensus";

#[derive(Debug, Error, PartialEq)]
pub enum QvfError {
    #[error(transparent)]
    Ahp(#[from] AhpError),
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Dense matrix rows as submitted. Validated by [`prepare_submissions`] so
/// a malformed matrix surfaces as the precise [`AhpError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRows {
    pub criterion_ids: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl From<&ComparisonMatrix> for MatrixRows {
    fn from(matrix: &ComparisonMatrix) -> Self {
        Self {
            criterion_ids: matrix.criterion_ids().to_vec(),
            values: matrix.to_rows(),
        }
    }
}

/// How a stakeholder supplied their comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgmentSource {
    Matrix { comparison_matrix: MatrixRows },
    Judgments { judgments: Vec<PairwiseJudgment> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderInput {
    pub stakeholder_id: String,
    pub role: String,
    #[serde(flatten)]
    pub source: JudgmentSource,
}

/// Criteria and the judgments collected for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub criteria: CriteriaConfig,
    #[serde(default)]
    pub stakeholder_submissions: Vec<StakeholderInput>,
    /// Role to relative weight. `None` weighs stakeholders equally.
    #[serde(default)]
    pub role_weights: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub solver: SolverConfig,
    pub consistency: ConsistencyConfig,
}

/// JSON request for one run: a session, the item batch and optional tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub session: SessionDescriptor,
    #[serde(default)]
    pub items: Vec<WorkItemCriteriaValues>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub solver_config: Option<SolverConfig>,
    #[serde(default)]
    pub consistency_config: Option<ConsistencyConfig>,
}

impl RunRequest {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            solver: self.solver_config.clone().unwrap_or_default(),
            consistency: self.consistency_config.clone().unwrap_or_default(),
        }
    }
}

/// Advisory findings attached to a run. None of them alter the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QvfWarning {
    /// Every item had the same value (or none), so the criterion scored 0.5.
    DegenerateCriterion { criterion_id: String },
    /// Some items were missing this criterion and took the run median.
    ImputedValues {
        criterion_id: String,
        imputed_items: usize,
    },
    /// `scope` is [`CONSENSUS_SCOPE`] or a stakeholder id.
    LowConsistency {
        scope: String,
        consistency_ratio: f64,
        threshold: f64,
    },
    ExtrapolatedRandomIndex {
        criteria_count: usize,
        random_index: f64,
    },
    SolverNotConverged { scope: String, iterations: usize },
}

impl fmt::Display for QvfWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QvfWarning::DegenerateCriterion { criterion_id } => {
                write!(f, "criterion {criterion_id} does not discriminate between items")
            }
            QvfWarning::ImputedValues {
                criterion_id,
                imputed_items,
            } => write!(
                f,
                "criterion {criterion_id} imputed for {imputed_items} item(s)"
            ),
            QvfWarning::LowConsistency {
                scope,
                consistency_ratio,
                threshold,
            } => write!(
                f,
                "{scope} consistency ratio {consistency_ratio:.4} exceeds {threshold}"
            ),
            QvfWarning::ExtrapolatedRandomIndex {
                criteria_count,
                random_index,
            } => write!(
                f,
                "random index for {criteria_count} criteria extrapolated to {random_index:.2}"
            ),
            QvfWarning::SolverNotConverged { scope, iterations } => write!(
                f,
                "{scope} weights did not converge after {iterations} iteration(s)"
            ),
        }
    }
}

fn push_warning(warnings: &mut Vec<QvfWarning>, warning: QvfWarning) {
    warn!(%warning, "qvf warning");
    warnings.push(warning);
}

/// Where the consensus weights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    /// Aggregated stakeholder judgments.
    Stakeholders,
    /// No submissions; the configured criteria weights were used as-is.
    Configured,
}

/// Output of the weight phase alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDerivation {
    pub weight_source: WeightSource,
    pub consensus_weights: PriorityVector,
    pub consistency: ConsistencyResult,
    pub per_stakeholder_consistency: Vec<ConsistencyResult>,
    pub stakeholder_diagnostics: Vec<StakeholderDiagnostics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_matrix: Option<ComparisonMatrix>,
    pub warnings: Vec<QvfWarning>,
}

/// Full run output. A new run always produces a new value under a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QvfRunOutput {
    pub run_id: String,
    pub weight_source: WeightSource,
    pub consensus_weights: PriorityVector,
    pub consistency: ConsistencyResult,
    pub per_stakeholder_consistency: Vec<ConsistencyResult>,
    pub scores: Vec<QvfScoreResult>,
    pub warnings: Vec<QvfWarning>,
    pub stakeholder_diagnostics: Vec<StakeholderDiagnostics>,
    /// Criteria carrying the consensus weights the scores were computed with.
    pub criteria: CriteriaConfig,
}

/// Turn raw stakeholder input into submissions aligned with `config`.
///
/// Matrix rows are validated here. Matrices given over a permutation of the
/// configured criteria are reordered; any other id set is a
/// [`AhpError::CriteriaMismatch`].
pub fn prepare_submissions(
    config: &CriteriaConfig,
    inputs: &[StakeholderInput],
) -> Result<Vec<StakeholderSubmission>, AhpError> {
    let ids = config.ids();
    inputs
        .iter()
        .map(|input| match &input.source {
            JudgmentSource::Judgments { judgments } => StakeholderSubmission::from_judgments(
                input.stakeholder_id.clone(),
                input.role.clone(),
                config.criteria(),
                judgments,
            ),
            JudgmentSource::Matrix { comparison_matrix } => {
                let submitted = ComparisonMatrix::from_rows(
                    comparison_matrix.criterion_ids.clone(),
                    comparison_matrix.values.clone(),
                )?;
                let matrix = submitted.reordered(&ids).ok_or_else(|| {
                    AhpError::CriteriaMismatch {
                        stakeholder_id: input.stakeholder_id.clone(),
                        expected: ids.clone(),
                        got: comparison_matrix.criterion_ids.clone(),
                    }
                })?;
                Ok(StakeholderSubmission::new(
                    input.stakeholder_id.clone(),
                    input.role.clone(),
                    matrix,
                ))
            }
        })
        .collect()
}

fn consistency_warnings(
    scope: &str,
    result: &ConsistencyResult,
    warnings: &mut Vec<QvfWarning>,
) {
    if !result.is_acceptable {
        push_warning(
            warnings,
            QvfWarning::LowConsistency {
                scope: scope.to_string(),
                consistency_ratio: result.consistency_ratio,
                threshold: result.acceptance_threshold,
            },
        );
    }
}

/// Weight phase only: build, aggregate, solve and check.
pub fn derive_weights(
    session: &SessionDescriptor,
    engine: &EngineConfig,
) -> Result<WeightDerivation, QvfError> {
    if let Some(threshold) = engine.consistency.threshold_override {
        warn!(
            threshold,
            effective = engine.consistency.threshold(),
            "consistency threshold overridden"
        );
    }

    let submissions = prepare_submissions(&session.criteria, &session.stakeholder_submissions)?;
    let mut warnings = Vec::new();

    if submissions.is_empty() {
        let n = session.criteria.len();
        info!(n, "no stakeholder submissions, using configured weights");
        return Ok(WeightDerivation {
            weight_source: WeightSource::Configured,
            consensus_weights: session.criteria.weights(),
            consistency: check(n as f64, n, &engine.consistency),
            per_stakeholder_consistency: Vec::new(),
            stakeholder_diagnostics: Vec::new(),
            aggregate_matrix: None,
            warnings,
        });
    }

    let result = aggregate(
        &submissions,
        session.role_weights.as_ref(),
        &engine.solver,
        &engine.consistency,
    )?;

    if result.consistency.random_index_extrapolated {
        push_warning(
            &mut warnings,
            QvfWarning::ExtrapolatedRandomIndex {
                criteria_count: result.consistency.criteria_count,
                random_index: result.consistency.random_index,
            },
        );
    }
    consistency_warnings(CONSENSUS_SCOPE, &result.consistency, &mut warnings);
    if !result.consensus.converged {
        push_warning(
            &mut warnings,
            QvfWarning::SolverNotConverged {
                scope: CONSENSUS_SCOPE.to_string(),
                iterations: result.consensus.iterations,
            },
        );
    }
    for diag in &result.diagnostics {
        consistency_warnings(&diag.stakeholder_id, &diag.consistency, &mut warnings);
        if !diag.solver_converged {
            push_warning(
                &mut warnings,
                QvfWarning::SolverNotConverged {
                    scope: diag.stakeholder_id.clone(),
                    iterations: engine.solver.max_iterations,
                },
            );
        }
    }

    Ok(WeightDerivation {
        weight_source: WeightSource::Stakeholders,
        consensus_weights: result.consensus.priorities,
        consistency: result.consistency,
        per_stakeholder_consistency: result.per_stakeholder,
        stakeholder_diagnostics: result.diagnostics,
        aggregate_matrix: Some(result.aggregate_matrix),
        warnings,
    })
}

/// Derive weights and score `items`. A random UUID v4 is used when `run_id`
/// is `None`.
pub fn run(
    session: &SessionDescriptor,
    items: &[WorkItemCriteriaValues],
    engine: &EngineConfig,
    run_id: Option<String>,
) -> Result<QvfRunOutput, QvfError> {
    let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let derivation = derive_weights(session, engine)?;
    let criteria = session.criteria.with_weights(&derivation.consensus_weights)?;

    let batch = score_batch(
        items,
        &derivation.consensus_weights,
        criteria.criteria(),
        derivation.consistency.consistency_ratio,
    )?;

    let mut warnings = derivation.warnings;
    for criterion_id in batch.degenerate_criteria {
        push_warning(&mut warnings, QvfWarning::DegenerateCriterion { criterion_id });
    }
    for (criterion_id, imputed_items) in batch.imputed_counts {
        push_warning(
            &mut warnings,
            QvfWarning::ImputedValues {
                criterion_id,
                imputed_items,
            },
        );
    }

    debug!(
        run_id = %run_id,
        items = items.len(),
        warnings = warnings.len(),
        "qvf run complete"
    );

    Ok(QvfRunOutput {
        run_id,
        weight_source: derivation.weight_source,
        consensus_weights: derivation.consensus_weights,
        consistency: derivation.consistency,
        per_stakeholder_consistency: derivation.per_stakeholder_consistency,
        scores: batch.results,
        warnings,
        stakeholder_diagnostics: derivation.stakeholder_diagnostics,
        criteria,
    })
}

/// [`run`] driven by a deserialized request.
pub fn run_request(req: RunRequest) -> Result<QvfRunOutput, QvfError> {
    let engine = req.engine();
    run(&req.session, &req.items, &engine, req.run_id)
}

/// [`derive_weights`] driven by a deserialized request; items are ignored.
pub fn weights_request(req: &RunRequest) -> Result<WeightDerivation, QvfError> {
    derive_weights(&req.session, &req.engine())
}
