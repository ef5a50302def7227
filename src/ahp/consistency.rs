//! Saaty consistency index / ratio and judgment-level diagnostics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matrix::ComparisonMatrix;
use super::solver::PriorityVector;
use super::AhpError;

/// Saaty's random consistency index for n = 1..=15.
pub const RANDOM_INDEX: [f64; 15] = [
    0.0, 0.0, 0.58, 0.90, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49, 1.51, 1.48, 1.56, 1.57, 1.59,
];

/// Standard acceptance threshold for the consistency ratio.
pub const ACCEPTABLE_CONSISTENCY_RATIO: f64 = 0.10;

/// Consistency policy.
///
/// The 0.10 threshold can only be changed through `threshold_override`;
/// there is no implicit loosening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub threshold_override: Option<f64>,
}

impl ConsistencyConfig {
    pub fn threshold(&self) -> f64 {
        self.threshold_override
            .filter(|t| t.is_finite() && *t >= 0.0)
            .unwrap_or(ACCEPTABLE_CONSISTENCY_RATIO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub lambda_max: f64,
    pub consistency_index: f64,
    pub random_index: f64,
    pub consistency_ratio: f64,
    pub is_acceptable: bool,
    pub criteria_count: usize,
    /// True when `criteria_count` is beyond the published table.
    pub random_index_extrapolated: bool,
    pub acceptance_threshold: f64,
}

/// Random index for `n` criteria and whether it was extrapolated.
///
/// Past n = 15 the value continues the line through the last two entries.
pub fn random_index(n: usize) -> (f64, bool) {
    let table_len = RANDOM_INDEX.len();
    if n == 0 {
        return (0.0, false);
    }
    if n <= table_len {
        return (RANDOM_INDEX[n - 1], false);
    }
    let last = RANDOM_INDEX[table_len - 1];
    let slope = last - RANDOM_INDEX[table_len - 2];
    (last + slope * (n - table_len) as f64, true)
}

/// Consistency of a matrix of size `n` with principal eigenvalue `lambda_max`.
pub fn check(lambda_max: f64, n: usize, cfg: &ConsistencyConfig) -> ConsistencyResult {
    let threshold = cfg.threshold();
    let (ri, extrapolated) = random_index(n);

    let ci = if n > 1 {
        ((lambda_max - n as f64) / (n as f64 - 1.0)).max(0.0)
    } else {
        0.0
    };
    let cr = if ri > 0.0 { ci / ri } else { 0.0 };

    debug!(n, lambda_max, ci, cr, "consistency check");

    ConsistencyResult {
        lambda_max,
        consistency_index: ci,
        random_index: ri,
        consistency_ratio: cr,
        is_acceptable: cr <= threshold,
        criteria_count: n,
        random_index_extrapolated: extrapolated,
        acceptance_threshold: threshold,
    }
}

/// One upper-triangle judgment compared against the ratio implied by weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentDeviation {
    pub criterion_a_id: String,
    pub criterion_b_id: String,
    pub judged_value: f64,
    /// `w_a / w_b`.
    pub implied_value: f64,
    /// `|ln(judged / implied)|`.
    pub log_deviation: f64,
}

/// Judgments ranked by how far they sit from the derived weights.
///
/// Revisiting the top entries first is the quickest way to bring a
/// stakeholder's consistency ratio down.
pub fn most_inconsistent_judgments(
    matrix: &ComparisonMatrix,
    priorities: &PriorityVector,
    limit: usize,
) -> Result<Vec<JudgmentDeviation>, AhpError> {
    if priorities.criterion_ids.as_slice() != matrix.criterion_ids()
        || priorities.weights.len() != matrix.size()
    {
        return Err(AhpError::CriteriaMismatch {
            stakeholder_id: "priorities".to_string(),
            expected: matrix.criterion_ids().to_vec(),
            got: priorities.criterion_ids.clone(),
        });
    }

    let w = &priorities.weights;
    let ids = matrix.criterion_ids();
    let n = matrix.size();
    let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for k in (i + 1)..n {
            if w[i] <= 0.0 || w[k] <= 0.0 {
                continue;
            }
            let judged = matrix.get(i, k);
            let implied = w[i] / w[k];
            out.push(JudgmentDeviation {
                criterion_a_id: ids[i].clone(),
                criterion_b_id: ids[k].clone(),
                judged_value: judged,
                implied_value: implied,
                log_deviation: (judged / implied).ln().abs(),
            });
        }
    }
    out.sort_by(|a, b| {
        b.log_deviation
            .total_cmp(&a.log_deviation)
            .then_with(|| a.criterion_a_id.cmp(&b.criterion_a_id))
            .then_with(|| a.criterion_b_id.cmp(&b.criterion_b_id))
    });
    out.truncate(limit);
    Ok(out)
}
