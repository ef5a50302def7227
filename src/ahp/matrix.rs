//! Reciprocal pairwise comparison matrices.

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::AhpError;
use crate::criteria::Criterion;

/// Smallest admissible judgment (extreme importance of B over A).
pub const SAATY_MIN: f64 = 1.0 / 9.0;
/// Largest admissible judgment (extreme importance of A over B).
pub const SAATY_MAX: f64 = 9.0;

/// Relative slack at the scale bounds so `1/9` typed in any form is accepted.
const SCALE_TOLERANCE: f64 = 1e-9;
/// Relative slack when checking a dense matrix for reciprocity.
const RECIPROCITY_TOLERANCE: f64 = 1e-9;

/// One judgment: how much more important `criterion_a_id` is than
/// `criterion_b_id` on the Saaty 1-9 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseJudgment {
    pub criterion_a_id: String,
    pub criterion_b_id: String,
    pub value: f64,
}

impl PairwiseJudgment {
    pub fn new(
        criterion_a_id: impl Into<String>,
        criterion_b_id: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            criterion_a_id: criterion_a_id.into(),
            criterion_b_id: criterion_b_id.into(),
            value,
        }
    }
}

fn on_saaty_scale(value: f64) -> bool {
    value.is_finite()
        && value >= SAATY_MIN * (1.0 - SCALE_TOLERANCE)
        && value <= SAATY_MAX * (1.0 + SCALE_TOLERANCE)
}

/// n×n reciprocal judgment matrix over an ordered criteria list.
///
/// `A[i][i] = 1` and `A[j][i] = 1 / A[i][j]` hold by construction: only the
/// upper triangle is ever taken from input, the lower triangle is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComparisonMatrix", into = "RawComparisonMatrix")]
pub struct ComparisonMatrix {
    criterion_ids: Vec<String>,
    values: DMatrix<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawComparisonMatrix {
    criterion_ids: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl ComparisonMatrix {
    /// Build a matrix from a complete set of judgments.
    ///
    /// Judgments may name a pair in either orientation; `(b, a, v)` is stored
    /// as `A[a][b] = 1/v`.
    pub fn build(criteria: &[Criterion], judgments: &[PairwiseJudgment]) -> Result<Self, AhpError> {
        let criterion_ids: Vec<String> = criteria.iter().map(|c| c.id.clone()).collect();
        let index = index_criteria(&criterion_ids)?;
        let n = criterion_ids.len();

        let mut upper: HashMap<(usize, usize), f64> = HashMap::with_capacity(n * (n - 1) / 2);
        for j in judgments {
            let a = *index
                .get(j.criterion_a_id.as_str())
                .ok_or_else(|| AhpError::UnknownCriterion {
                    criterion_id: j.criterion_a_id.clone(),
                })?;
            let b = *index
                .get(j.criterion_b_id.as_str())
                .ok_or_else(|| AhpError::UnknownCriterion {
                    criterion_id: j.criterion_b_id.clone(),
                })?;
            if a == b {
                return Err(AhpError::SelfComparison {
                    criterion_id: j.criterion_a_id.clone(),
                });
            }
            if !on_saaty_scale(j.value) {
                return Err(AhpError::InvalidJudgment {
                    criterion_a_id: j.criterion_a_id.clone(),
                    criterion_b_id: j.criterion_b_id.clone(),
                    value: j.value,
                });
            }
            let (key, value) = if a < b {
                ((a, b), j.value)
            } else {
                ((b, a), 1.0 / j.value)
            };
            if upper.insert(key, value).is_some() {
                return Err(AhpError::DuplicateJudgment {
                    criterion_a_id: criterion_ids[key.0].clone(),
                    criterion_b_id: criterion_ids[key.1].clone(),
                });
            }
        }

        let mut missing = Vec::new();
        for i in 0..n {
            for k in (i + 1)..n {
                if !upper.contains_key(&(i, k)) {
                    missing.push((criterion_ids[i].clone(), criterion_ids[k].clone()));
                }
            }
        }
        if !missing.is_empty() {
            return Err(AhpError::IncompleteComparison { missing });
        }

        Ok(Self::from_upper(criterion_ids, |i, k| upper[&(i, k)]))
    }

    /// Build a matrix from dense rows, validating shape, diagonal, scale and
    /// reciprocity. The stored lower triangle is recomputed from the upper one.
    pub fn from_rows(criterion_ids: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, AhpError> {
        index_criteria(&criterion_ids)?;
        let n = criterion_ids.len();
        if rows.len() != n {
            return Err(AhpError::MatrixShape {
                expected: n,
                detail: format!("got {} rows", rows.len()),
            });
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(AhpError::MatrixShape {
                    expected: n,
                    detail: format!("row {r} has {} entries", row.len()),
                });
            }
        }

        for i in 0..n {
            let d = rows[i][i];
            if !d.is_finite() || (d - 1.0).abs() > RECIPROCITY_TOLERANCE {
                return Err(AhpError::NonReciprocal {
                    row: i,
                    col: i,
                    value: d,
                    expected: 1.0,
                });
            }
            for k in (i + 1)..n {
                let v = rows[i][k];
                if !on_saaty_scale(v) {
                    return Err(AhpError::InvalidJudgment {
                        criterion_a_id: criterion_ids[i].clone(),
                        criterion_b_id: criterion_ids[k].clone(),
                        value: v,
                    });
                }
                let expected = 1.0 / v;
                let got = rows[k][i];
                if !got.is_finite() || (got - expected).abs() > RECIPROCITY_TOLERANCE * expected {
                    return Err(AhpError::NonReciprocal {
                        row: k,
                        col: i,
                        value: got,
                        expected,
                    });
                }
            }
        }

        Ok(Self::from_upper(criterion_ids, |i, k| rows[i][k]))
    }

    /// Fill the upper triangle from `upper(i, k)` for `i < k` and derive the
    /// rest. Callers guarantee positive finite entries.
    pub(crate) fn from_upper(criterion_ids: Vec<String>, upper: impl Fn(usize, usize) -> f64) -> Self {
        let n = criterion_ids.len();
        let mut values = DMatrix::<f64>::from_element(n, n, 1.0);
        for i in 0..n {
            for k in (i + 1)..n {
                let v = upper(i, k);
                values[(i, k)] = v;
                values[(k, i)] = 1.0 / v;
            }
        }
        Self {
            criterion_ids,
            values,
        }
    }

    /// Same judgments expressed over a permutation of the criteria.
    pub fn reordered(&self, criterion_ids: &[String]) -> Option<Self> {
        if criterion_ids.len() != self.criterion_ids.len() {
            return None;
        }
        let positions: Vec<usize> = criterion_ids
            .iter()
            .map(|id| self.index_of(id))
            .collect::<Option<_>>()?;
        let unique: HashSet<usize> = positions.iter().copied().collect();
        if unique.len() != positions.len() {
            return None;
        }
        Some(Self::from_upper(criterion_ids.to_vec(), |i, k| {
            self.values[(positions[i], positions[k])]
        }))
    }

    pub fn criterion_ids(&self) -> &[String] {
        &self.criterion_ids
    }

    pub fn size(&self) -> usize {
        self.criterion_ids.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn index_of(&self, criterion_id: &str) -> Option<usize> {
        self.criterion_ids.iter().position(|id| id == criterion_id)
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.values.nrows())
            .map(|r| (0..self.values.ncols()).map(|c| self.values[(r, c)]).collect())
            .collect()
    }
}

fn index_criteria(criterion_ids: &[String]) -> Result<HashMap<&str, usize>, AhpError> {
    if criterion_ids.is_empty() {
        return Err(AhpError::EmptyCriteria);
    }
    let mut index = HashMap::with_capacity(criterion_ids.len());
    for (idx, id) in criterion_ids.iter().enumerate() {
        if index.insert(id.as_str(), idx).is_some() {
            return Err(AhpError::DuplicateCriterion {
                criterion_id: id.clone(),
            });
        }
    }
    Ok(index)
}

impl TryFrom<RawComparisonMatrix> for ComparisonMatrix {
    type Error = AhpError;

    fn try_from(raw: RawComparisonMatrix) -> Result<Self, Self::Error> {
        Self::from_rows(raw.criterion_ids, raw.values)
    }
}

impl From<ComparisonMatrix> for RawComparisonMatrix {
    fn from(matrix: ComparisonMatrix) -> Self {
        Self {
            values: matrix.to_rows(),
            criterion_ids: matrix.criterion_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriterionCategory, Polarity};

    fn criteria(ids: &[&str]) -> Vec<Criterion> {
        ids.iter()
            .map(|id| {
                Criterion::new(
                    *id,
                    *id,
                    CriterionCategory::Other,
                    Polarity::HigherIsBetter,
                    1.0 / ids.len() as f64,
                )
            })
            .collect()
    }

    #[test]
    fn build_places_reciprocals() {
        let m = ComparisonMatrix::build(
            &criteria(&["a", "b", "c"]),
            &[
                PairwiseJudgment::new("a", "b", 3.0),
                PairwiseJudgment::new("c", "a", 0.2),
                PairwiseJudgment::new("b", "c", 2.0),
            ],
        )
        .unwrap();

        assert_eq!(m.size(), 3);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 1.0);
            for k in 0..3 {
                assert!((m.get(i, k) * m.get(k, i) - 1.0).abs() < 1e-12);
            }
        }
        assert_eq!(m.get(0, 1), 3.0);
        assert!((m.get(0, 2) - 5.0).abs() < 1e-12);
        assert!((m.get(2, 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn build_reports_every_missing_pair() {
        let err = ComparisonMatrix::build(
            &criteria(&["a", "b", "c", "d"]),
            &[
                PairwiseJudgment::new("a", "b", 2.0),
                PairwiseJudgment::new("a", "c", 2.0),
                PairwiseJudgment::new("b", "c", 1.0),
                PairwiseJudgment::new("c", "d", 4.0),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AhpError::IncompleteComparison {
                missing: vec![
                    ("a".to_string(), "d".to_string()),
                    ("b".to_string(), "d".to_string()),
                ],
            }
        );
    }

    #[test]
    fn build_rejects_invalid_input() {
        let cs = criteria(&["a", "b"]);
        assert!(matches!(
            ComparisonMatrix::build(&cs, &[PairwiseJudgment::new("a", "b", 10.0)]),
            Err(AhpError::InvalidJudgment { .. })
        ));
        assert!(matches!(
            ComparisonMatrix::build(&cs, &[PairwiseJudgment::new("a", "b", 0.1)]),
            Err(AhpError::InvalidJudgment { .. })
        ));
        assert!(matches!(
            ComparisonMatrix::build(&cs, &[PairwiseJudgment::new("a", "b", f64::NAN)]),
            Err(AhpError::InvalidJudgment { .. })
        ));
        assert!(matches!(
            ComparisonMatrix::build(&cs, &[PairwiseJudgment::new("a", "z", 2.0)]),
            Err(AhpError::UnknownCriterion { .. })
        ));
        assert!(matches!(
            ComparisonMatrix::build(&cs, &[PairwiseJudgment::new("a", "a", 1.0)]),
            Err(AhpError::SelfComparison { .. })
        ));
        assert!(matches!(
            ComparisonMatrix::build(
                &cs,
                &[
                    PairwiseJudgment::new("a", "b", 2.0),
                    PairwiseJudgment::new("b", "a", 0.5),
                ]
            ),
            Err(AhpError::DuplicateJudgment { .. })
        ));
        assert_eq!(ComparisonMatrix::build(&[], &[]), Err(AhpError::EmptyCriteria));
    }

    #[test]
    fn scale_bounds_are_inclusive() {
        let cs = criteria(&["a", "b", "c"]);
        let m = ComparisonMatrix::build(
            &cs,
            &[
                PairwiseJudgment::new("a", "b", 9.0),
                PairwiseJudgment::new("a", "c", 1.0 / 9.0),
                PairwiseJudgment::new("b", "c", 0.111_111_111_111),
            ],
        );
        assert!(m.is_ok());
    }

    #[test]
    fn single_criterion_needs_no_judgments() {
        let m = ComparisonMatrix::build(&criteria(&["only"]), &[]).unwrap();
        assert_eq!(m.size(), 1);
        assert_eq!(m.get(0, 0), 1.0);
    }

    #[test]
    fn from_rows_validates_reciprocity() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert!(ComparisonMatrix::from_rows(ids.clone(), vec![vec![1.0, 4.0], vec![0.25, 1.0]]).is_ok());
        assert!(matches!(
            ComparisonMatrix::from_rows(ids.clone(), vec![vec![1.0, 4.0], vec![0.5, 1.0]]),
            Err(AhpError::NonReciprocal { row: 1, col: 0, .. })
        ));
        assert!(matches!(
            ComparisonMatrix::from_rows(ids.clone(), vec![vec![2.0, 4.0], vec![0.25, 1.0]]),
            Err(AhpError::NonReciprocal { row: 0, col: 0, .. })
        ));
        assert!(matches!(
            ComparisonMatrix::from_rows(ids, vec![vec![1.0, 4.0]]),
            Err(AhpError::MatrixShape { .. })
        ));
    }

    #[test]
    fn serde_round_trip_revalidates() {
        let m = ComparisonMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 3.0], vec![1.0 / 3.0, 1.0]],
        )
        .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: ComparisonMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let broken = r#"{"criterion_ids":["a","b"],"values":[[1.0,3.0],[3.0,1.0]]}"#;
        assert!(serde_json::from_str::<ComparisonMatrix>(broken).is_err());
    }

    #[test]
    fn reordered_permutes_cells() {
        let m = ComparisonMatrix::from_rows(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![
                vec![1.0, 2.0, 4.0],
                vec![0.5, 1.0, 2.0],
                vec![0.25, 0.5, 1.0],
            ],
        )
        .unwrap();
        let order = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let r = m.reordered(&order).unwrap();
        assert_eq!(r.criterion_ids(), order.as_slice());
        assert!((r.get(0, 1) - 0.25).abs() < 1e-12);
        assert!((r.get(1, 2) - 2.0).abs() < 1e-12);
        assert!(m.reordered(&["a".to_string(), "a".to_string(), "b".to_string()]).is_none());
    }
}
