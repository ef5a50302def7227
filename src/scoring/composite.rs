//! Weighted-sum composite scores, ranking and confidence.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normalize::{normalize_items, NormalizedCriterion, WorkItemCriteriaValues};
use super::ScoringError;
use crate::ahp::PriorityVector;
use crate::criteria::{Criterion, WEIGHT_SUM_TOLERANCE};

/// Score, rank and explanation for one item in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QvfScoreResult {
    pub item_id: String,
    pub composite_score: f64,
    /// 1-based position in the run's ranking.
    pub rank: usize,
    /// `weight[c] * normalized(item, c)`; sums to `composite_score`.
    pub per_criterion_contribution: BTreeMap<String, f64>,
    pub confidence: f64,
    /// Fraction of criteria that were not imputed for this item.
    pub data_completeness: f64,
    pub imputed_criteria: Vec<String>,
    pub category_contributions: BTreeMap<String, f64>,
}

/// Ranked results plus the per-criterion facts warnings are built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBatch {
    pub results: Vec<QvfScoreResult>,
    pub degenerate_criteria: Vec<String>,
    /// `(criterion_id, imputed item count)` for criteria with any imputation.
    pub imputed_counts: Vec<(String, usize)>,
}

fn cr_penalty(consensus_cr: f64) -> f64 {
    if consensus_cr.is_finite() && consensus_cr > 0.0 {
        consensus_cr.min(1.0)
    } else {
        0.0
    }
}

fn check_weights(weights: &PriorityVector, criteria: &[Criterion]) -> Result<(), ScoringError> {
    let aligned = weights.weights.len() == criteria.len()
        && weights.criterion_ids.len() == criteria.len()
        && weights
            .criterion_ids
            .iter()
            .zip(criteria)
            .all(|(id, c)| *id == c.id);
    if !aligned {
        return Err(ScoringError::WeightCriteriaMismatch {
            expected: criteria.iter().map(|c| c.id.clone()).collect(),
            got: weights.criterion_ids.clone(),
        });
    }
    for (id, w) in weights.iter() {
        if !w.is_finite() || w < 0.0 {
            return Err(ScoringError::InvalidWeight {
                criterion_id: id.to_string(),
                weight: w,
            });
        }
    }
    let sum: f64 = weights.weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ScoringError::WeightSum { sum });
    }
    Ok(())
}

fn score_item(
    idx: usize,
    item: &WorkItemCriteriaValues,
    weights: &[f64],
    criteria: &[Criterion],
    normalized: &[NormalizedCriterion],
    penalty: f64,
) -> QvfScoreResult {
    let mut composite = 0.0;
    let mut per_criterion_contribution = BTreeMap::new();
    let mut category_contributions: BTreeMap<String, f64> = BTreeMap::new();
    let mut imputed_criteria = Vec::new();

    for ((criterion, w), norm) in criteria.iter().zip(weights).zip(normalized) {
        let contribution = w * norm.values[idx];
        composite += contribution;
        per_criterion_contribution.insert(criterion.id.clone(), contribution);
        *category_contributions
            .entry(criterion.category.as_str().to_string())
            .or_insert(0.0) += contribution;
        if norm.imputed[idx] {
            imputed_criteria.push(criterion.id.clone());
        }
    }

    let data_completeness = if criteria.is_empty() {
        1.0
    } else {
        (criteria.len() - imputed_criteria.len()) as f64 / criteria.len() as f64
    };

    QvfScoreResult {
        item_id: item.item_id.clone(),
        composite_score: composite,
        rank: 0,
        per_criterion_contribution,
        confidence: data_completeness * (1.0 - penalty),
        data_completeness,
        imputed_criteria,
        category_contributions,
    }
}

/// Score and rank `items`.
///
/// `consensus_cr` is the consistency ratio of the weights' source; it lowers
/// every item's confidence uniformly (capped at 1).
pub fn score_batch(
    items: &[WorkItemCriteriaValues],
    weights: &PriorityVector,
    criteria: &[Criterion],
    consensus_cr: f64,
) -> Result<ScoreBatch, ScoringError> {
    check_weights(weights, criteria)?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.item_id.as_str()) {
            return Err(ScoringError::DuplicateItem {
                item_id: item.item_id.clone(),
            });
        }
    }

    let normalized = normalize_items(criteria, items)?;
    let penalty = cr_penalty(consensus_cr);

    let mut results: Vec<QvfScoreResult> = items
        .par_iter()
        .enumerate()
        .map(|(idx, item)| score_item(idx, item, &weights.weights, criteria, &normalized, penalty))
        .collect();

    results.sort_by(|a, b| {
        b.composite_score
            .total_cmp(&a.composite_score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    for (pos, r) in results.iter_mut().enumerate() {
        r.rank = pos + 1;
    }

    let degenerate_criteria = normalized
        .iter()
        .filter(|n| n.degenerate)
        .map(|n| n.criterion_id.clone())
        .collect();
    let imputed_counts = normalized
        .iter()
        .map(|n| (n.criterion_id.clone(), n.imputed_count()))
        .filter(|(_, count)| *count > 0)
        .collect();

    debug!(items = items.len(), criteria = criteria.len(), "scored batch");

    Ok(ScoreBatch {
        results,
        degenerate_criteria,
        imputed_counts,
    })
}

/// Ranked results only; see [`score_batch`].
pub fn score(
    items: &[WorkItemCriteriaValues],
    weights: &PriorityVector,
    criteria: &[Criterion],
    consensus_cr: f64,
) -> Result<Vec<QvfScoreResult>, ScoringError> {
    Ok(score_batch(items, weights, criteria, consensus_cr)?.results)
}
