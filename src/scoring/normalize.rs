//! Min-max normalization of raw criterion values within one scoring run.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ScoringError;
use crate::criteria::{Criterion, Polarity};

/// Score given to every item on a criterion that cannot discriminate.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Raw per-criterion values for one work item. Absent keys are missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemCriteriaValues {
    pub item_id: String,
    #[serde(default)]
    pub raw_values: HashMap<String, f64>,
}

impl WorkItemCriteriaValues {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            raw_values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, criterion_id: impl Into<String>, value: f64) -> Self {
        self.raw_values.insert(criterion_id.into(), value);
        self
    }
}

/// One criterion normalized across every item of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCriterion {
    pub criterion_id: String,
    /// In `[0, 1]`, oriented so that higher is always better.
    pub values: Vec<f64>,
    /// True where the raw value was missing and the median stood in.
    pub imputed: Vec<bool>,
    /// All available values were equal (or none were available).
    pub degenerate: bool,
    pub observed_min: Option<f64>,
    pub observed_max: Option<f64>,
    /// Median used for missing values, if any value was available.
    pub imputed_value: Option<f64>,
}

impl NormalizedCriterion {
    pub fn imputed_count(&self) -> usize {
        self.imputed.iter().filter(|i| **i).count()
    }
}

fn median(mut v: Vec<f64>) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = v.len();
    if n % 2 == 1 {
        Some(v[n / 2])
    } else {
        Some(0.5 * (v[n / 2 - 1] + v[n / 2]))
    }
}

/// Normalize one criterion's raw values (`None` = missing) onto `[0, 1]`.
pub fn normalize(
    criterion: &Criterion,
    raw_values: &[Option<f64>],
) -> Result<NormalizedCriterion, ScoringError> {
    let mut available = Vec::with_capacity(raw_values.len());
    for (position, v) in raw_values.iter().enumerate() {
        if let Some(v) = *v {
            if !v.is_finite() {
                return Err(ScoringError::NonFiniteValue {
                    criterion_id: criterion.id.clone(),
                    position,
                    value: v,
                });
            }
            available.push(v);
        }
    }

    let observed_min = available.iter().copied().reduce(f64::min);
    let observed_max = available.iter().copied().reduce(f64::max);
    let imputed_value = median(available);
    let imputed: Vec<bool> = raw_values.iter().map(Option::is_none).collect();

    let (values, degenerate) = match (observed_min, observed_max, imputed_value) {
        (Some(min), Some(max), Some(fill)) if max > min => {
            let range = max - min;
            let values = raw_values
                .iter()
                .map(|v| {
                    let norm = (v.unwrap_or(fill) - min) / range;
                    match criterion.polarity {
                        Polarity::HigherIsBetter => norm,
                        Polarity::LowerIsBetter => 1.0 - norm,
                    }
                })
                .collect();
            (values, false)
        }
        _ => (vec![NEUTRAL_SCORE; raw_values.len()], true),
    };

    Ok(NormalizedCriterion {
        criterion_id: criterion.id.clone(),
        values,
        imputed,
        degenerate,
        observed_min,
        observed_max,
        imputed_value,
    })
}

/// Normalize every criterion across `items`, one criterion per rayon task.
///
/// Raw value keys that name no configured criterion are ignored.
pub fn normalize_items(
    criteria: &[Criterion],
    items: &[WorkItemCriteriaValues],
) -> Result<Vec<NormalizedCriterion>, ScoringError> {
    for item in items {
        for key in item.raw_values.keys() {
            if !criteria.iter().any(|c| &c.id == key) {
                debug!(item_id = %item.item_id, criterion_id = %key, "ignoring unknown criterion value");
            }
        }
    }

    criteria
        .par_iter()
        .map(|criterion| {
            let raw: Vec<Option<f64>> = items
                .iter()
                .map(|item| item.raw_values.get(&criterion.id).copied())
                .collect();
            normalize(criterion, &raw)
        })
        .collect()
}
