//! Priority vector and principal eigenvalue of a comparison matrix.
//!
//! Starts from Saaty's approximate eigenvector (normalized columns, row
//! averages) and refines it with damping-free power iteration. For a positive
//! reciprocal matrix the power method converges to the Perron vector, so a
//! handful of steps reaches the exact principal eigenvector without a full
//! eigendecomposition.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matrix::ComparisonMatrix;
use super::AhpError;

/// Weight sums further than this from 1.0 are treated as a solver failure.
const SUM_TOLERANCE: f64 = 1e-6;

/// Power-iteration refinement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Refinement step cap. Zero keeps the plain row-average approximation.
    pub max_iterations: usize,
    /// L1 delta between successive vectors at which refinement stops.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

/// Normalized weights, index-aligned with `criterion_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityVector {
    pub criterion_ids: Vec<String>,
    pub weights: Vec<f64>,
}

impl PriorityVector {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight_of(&self, criterion_id: &str) -> Option<f64> {
        self.criterion_ids
            .iter()
            .position(|id| id == criterion_id)
            .map(|idx| self.weights[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.criterion_ids
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Sum of absolute weight differences. Vectors must share an ordering.
    pub fn l1_distance(&self, other: &PriorityVector) -> f64 {
        self.weights
            .iter()
            .zip(&other.weights)
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}

/// Output of [`solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSolution {
    pub priorities: PriorityVector,
    pub lambda_max: f64,
    /// Power-iteration steps actually taken.
    pub iterations: usize,
    /// Whether refinement reached the configured tolerance.
    pub converged: bool,
}

fn normalize_column(values: &mut DMatrix<f64>, col: usize) -> f64 {
    let sum = values.column(col).sum();
    if sum > 0.0 {
        for row in 0..values.nrows() {
            values[(row, col)] /= sum;
        }
    }
    sum
}

fn check_weights(w: &DVector<f64>, stage: &str) -> Result<(), AhpError> {
    if let Some(idx) = w.iter().position(|x| !x.is_finite() || *x < 0.0) {
        return Err(AhpError::NumericalInstability {
            reason: format!("{stage}: weight {idx} is {}", w[idx]),
        });
    }
    Ok(())
}

/// Derive the priority vector and `lambda_max` of `matrix`.
pub fn solve(matrix: &ComparisonMatrix, cfg: &SolverConfig) -> Result<WeightSolution, AhpError> {
    let n = matrix.size();
    let criterion_ids = matrix.criterion_ids().to_vec();
    if n == 1 {
        return Ok(WeightSolution {
            priorities: PriorityVector {
                criterion_ids,
                weights: vec![1.0],
            },
            lambda_max: 1.0,
            iterations: 0,
            converged: true,
        });
    }

    let a = matrix.values();

    let mut normalized = a.clone();
    for col in 0..n {
        if normalize_column(&mut normalized, col) <= 0.0 {
            return Err(AhpError::NumericalInstability {
                reason: format!("column {col} sums to zero"),
            });
        }
    }
    let mut w = DVector::<f64>::from_fn(n, |row, _| normalized.row(row).sum() / n as f64);
    check_weights(&w, "row averages")?;
    let total = w.sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(AhpError::NumericalInstability {
            reason: format!("row averages sum to {total}"),
        });
    }
    w /= total;

    let mut iterations = 0;
    let mut converged = false;
    for iter in 1..=cfg.max_iterations {
        let mut next = a * &w;
        let next_sum = next.sum();
        if !next_sum.is_finite() || next_sum <= 0.0 {
            return Err(AhpError::NumericalInstability {
                reason: format!("power iteration {iter} produced sum {next_sum}"),
            });
        }
        next /= next_sum;
        let l1_delta: f64 = (&next - &w).iter().map(|d| d.abs()).sum();
        w = next;
        iterations = iter;
        if l1_delta <= cfg.tolerance {
            converged = true;
            break;
        }
    }
    check_weights(&w, "power iteration")?;

    let sum = w.sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(AhpError::NumericalInstability {
            reason: format!("weights sum to {sum}"),
        });
    }

    let aw = a * &w;
    let mut ratio_sum = 0.0;
    let mut counted = 0usize;
    for i in 0..n {
        if w[i] > 0.0 {
            ratio_sum += aw[i] / w[i];
            counted += 1;
        }
    }
    if counted == 0 {
        return Err(AhpError::NumericalInstability {
            reason: "all weights are zero".to_string(),
        });
    }
    // Mean of (Aw)_i / w_i is >= n for any reciprocal matrix; only rounding
    // can push it below.
    let lambda_max = (ratio_sum / counted as f64).max(n as f64);
    if !lambda_max.is_finite() {
        return Err(AhpError::NumericalInstability {
            reason: "lambda_max is not finite".to_string(),
        });
    }

    debug!(n, iterations, converged, lambda_max, "derived priority vector");

    Ok(WeightSolution {
        priorities: PriorityVector {
            criterion_ids,
            weights: w.iter().copied().collect(),
        },
        lambda_max,
        iterations,
        converged,
    })
}
