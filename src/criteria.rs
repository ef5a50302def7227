//! Criterion definitions and the immutable criteria configuration.
//!
//! A [`CriteriaConfig`] is the ordered set of criteria a session scores
//! against. The ordering is significant: comparison matrices, priority
//! vectors and contribution breakdowns are all index-aligned with it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ahp::PriorityVector;

/// Allowed drift of a weight vector's sum away from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Direction in which a raw criterion value is preferable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Coarse grouping used to roll contributions up in score explanations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionCategory {
    BusinessValue,
    StrategicAlignment,
    CustomerValue,
    ImplementationComplexity,
    Risk,
    #[default]
    Other,
}

impl CriterionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionCategory::BusinessValue => "business_value",
            CriterionCategory::StrategicAlignment => "strategic_alignment",
            CriterionCategory::CustomerValue => "customer_value",
            CriterionCategory::ImplementationComplexity => "implementation_complexity",
            CriterionCategory::Risk => "risk",
            CriterionCategory::Other => "other",
        }
    }
}

/// One scoring criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: CriterionCategory,
    pub polarity: Polarity,
    /// Relative importance. Omitted weights are treated as unset (see
    /// [`CriteriaConfig::new`]).
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: CriterionCategory,
        polarity: Polarity,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            polarity,
            weight,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CriteriaError {
    #[error("criteria configuration must contain at least one criterion")]
    Empty,
    #[error("criterion id must not be empty")]
    EmptyId,
    #[error("duplicate criterion id: {id}")]
    DuplicateId { id: String },
    #[error("invalid weight for criterion {id}: {weight}")]
    InvalidWeight { id: String, weight: f64 },
    #[error("criterion weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },
    #[error("weight vector does not match criteria: expected {expected:?}, got {got:?}")]
    WeightCount {
        expected: Vec<String>,
        got: Vec<String>,
    },
}

/// Validated, ordered criteria set.
///
/// Invariants: non-empty, unique non-empty ids, finite non-negative weights
/// summing to 1.0 within [`WEIGHT_SUM_TOLERANCE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Criterion>", into = "Vec<Criterion>")]
pub struct CriteriaConfig {
    criteria: Vec<Criterion>,
}

impl CriteriaConfig {
    /// Validate and wrap a list of criteria.
    ///
    /// If every weight is zero the weights are treated as unset and an equal
    /// prior `1/n` is assigned. Any other vector must already sum to 1.
    pub fn new(mut criteria: Vec<Criterion>) -> Result<Self, CriteriaError> {
        if criteria.is_empty() {
            return Err(CriteriaError::Empty);
        }

        let mut seen = HashSet::with_capacity(criteria.len());
        for c in &criteria {
            if c.id.trim().is_empty() {
                return Err(CriteriaError::EmptyId);
            }
            if !seen.insert(c.id.as_str()) {
                return Err(CriteriaError::DuplicateId { id: c.id.clone() });
            }
            if !c.weight.is_finite() || c.weight < 0.0 {
                return Err(CriteriaError::InvalidWeight {
                    id: c.id.clone(),
                    weight: c.weight,
                });
            }
        }

        if criteria.iter().all(|c| c.weight == 0.0) {
            let equal = 1.0 / criteria.len() as f64;
            for c in &mut criteria {
                c.weight = equal;
            }
        }

        let sum: f64 = criteria.iter().map(|c| c.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CriteriaError::WeightSum { sum });
        }

        Ok(Self { criteria })
    }

    /// Standard five-criterion QVF preset.
    pub fn default_preset() -> Self {
        let criteria = vec![
            Criterion::new(
                "business_value",
                "Business Value",
                CriterionCategory::BusinessValue,
                Polarity::HigherIsBetter,
                0.30,
            )
            .with_description("Expected revenue, cost saving or market impact"),
            Criterion::new(
                "strategic_alignment",
                "Strategic Alignment",
                CriterionCategory::StrategicAlignment,
                Polarity::HigherIsBetter,
                0.25,
            )
            .with_description("Fit with stated strategic themes and OKRs"),
            Criterion::new(
                "customer_value",
                "Customer Value",
                CriterionCategory::CustomerValue,
                Polarity::HigherIsBetter,
                0.20,
            )
            .with_description("Benefit to end users and customer satisfaction"),
            Criterion::new(
                "implementation_complexity",
                "Implementation Complexity",
                CriterionCategory::ImplementationComplexity,
                Polarity::LowerIsBetter,
                0.15,
            )
            .with_description("Effort, dependencies and technical difficulty"),
            Criterion::new(
                "risk",
                "Risk",
                CriterionCategory::Risk,
                Polarity::LowerIsBetter,
                0.10,
            )
            .with_description("Delivery, compliance and operational risk"),
        ];
        Self { criteria }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.criteria.iter().map(|c| c.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }

    /// Configured weights as a priority vector, in criteria order.
    pub fn weights(&self) -> PriorityVector {
        PriorityVector {
            criterion_ids: self.ids(),
            weights: self.criteria.iter().map(|c| c.weight).collect(),
        }
    }

    /// Copy of this configuration carrying derived weights.
    pub fn with_weights(&self, weights: &PriorityVector) -> Result<Self, CriteriaError> {
        let ids = self.ids();
        if weights.criterion_ids != ids || weights.weights.len() != ids.len() {
            return Err(CriteriaError::WeightCount {
                expected: ids,
                got: weights.criterion_ids.clone(),
            });
        }
        let criteria = self
            .criteria
            .iter()
            .zip(&weights.weights)
            .map(|(c, w)| Criterion {
                weight: *w,
                ..c.clone()
            })
            .collect();
        Self::new(criteria)
    }
}

impl TryFrom<Vec<Criterion>> for CriteriaConfig {
    type Error = CriteriaError;

    fn try_from(criteria: Vec<Criterion>) -> Result<Self, Self::Error> {
        Self::new(criteria)
    }
}

impl From<CriteriaConfig> for Vec<Criterion> {
    fn from(config: CriteriaConfig) -> Self {
        config.criteria
    }
}
