use serde_json::{json, Value};

use qvf_core::session::{run_request, weights_request, QvfRunOutput, RunRequest, WeightSource};
use qvf_core::{QvfError, QvfWarning};

fn request() -> Value {
    json!({
        "run_id": "run-fixed",
        "criteria": [
            {"id": "business_value", "name": "Business Value", "category": "business_value",
             "polarity": "higher_is_better", "weight": 0.6},
            {"id": "risk", "name": "Risk", "category": "risk",
             "polarity": "lower_is_better", "weight": 0.4}
        ],
        "stakeholder_submissions": [
            {"stakeholder_id": "pm-1", "role": "product",
             "judgments": [{"criterion_a_id": "business_value", "criterion_b_id": "risk", "value": 3}]},
            {"stakeholder_id": "eng-1", "role": "engineering",
             "comparison_matrix": {"criterion_ids": ["risk", "business_value"],
                                   "values": [[1, 3], [0.3333333333333333, 1]]}}
        ],
        "items": [
            {"item_id": "beta", "raw_values": {"business_value": 0, "risk": 1}},
            {"item_id": "alpha", "raw_values": {"business_value": 10, "risk": 5}}
        ]
    })
}

#[test]
fn opposing_stakeholders_cancel_to_equal_weights() {
    let req: RunRequest = serde_json::from_value(request()).unwrap();
    let out = run_request(req).unwrap();

    assert_eq!(out.run_id, "run-fixed");
    assert_eq!(out.weight_source, WeightSource::Stakeholders);
    // gm(3, 1/3) = 1
    for w in &out.consensus_weights.weights {
        assert!((w - 0.5).abs() < 1e-9);
    }
    assert_eq!(out.per_stakeholder_consistency.len(), 2);
    assert_eq!(out.stakeholder_diagnostics[1].stakeholder_id, "eng-1");
    assert!(out.stakeholder_diagnostics[0].distance_from_consensus > 0.0);

    // Both items are best on one criterion and worst on the other.
    assert_eq!(out.scores.len(), 2);
    assert_eq!(out.scores[0].rank, 1);
    assert_eq!(out.scores[1].rank, 2);
    for r in &out.scores {
        assert!((r.composite_score - 0.5).abs() < 1e-9);
    }
    assert!(out.warnings.is_empty());
}

#[test]
fn configured_weights_rank_the_scenario() {
    let mut raw = request();
    raw["stakeholder_submissions"] = json!([]);
    let req: RunRequest = serde_json::from_value(raw).unwrap();
    let out = run_request(req).unwrap();

    assert_eq!(out.weight_source, WeightSource::Configured);
    assert_eq!(out.scores[0].item_id, "alpha");
    assert!((out.scores[0].composite_score - 0.6).abs() < 1e-12);
    assert_eq!(out.scores[0].rank, 1);
    assert_eq!(out.scores[1].item_id, "beta");
    assert!((out.scores[1].composite_score - 0.4).abs() < 1e-12);
    assert_eq!(out.scores[1].rank, 2);
}

#[test]
fn output_uses_documented_field_names() {
    let req: RunRequest = serde_json::from_value(request()).unwrap();
    let out = run_request(req).unwrap();
    let value = serde_json::to_value(&out).unwrap();
    for key in [
        "run_id",
        "consensus_weights",
        "consistency",
        "per_stakeholder_consistency",
        "scores",
        "warnings",
        "stakeholder_diagnostics",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    let score = &value["scores"][0];
    for key in [
        "item_id",
        "composite_score",
        "rank",
        "per_criterion_contribution",
        "confidence",
    ] {
        assert!(score.get(key).is_some(), "missing scores[0].{key}");
    }

    let back: QvfRunOutput = serde_json::from_value(value).unwrap();
    assert_eq!(back, out);
}

#[test]
fn missing_run_id_gets_a_fresh_uuid() {
    let mut raw = request();
    raw.as_object_mut().unwrap().remove("run_id");
    let first = run_request(serde_json::from_value(raw.clone()).unwrap()).unwrap();
    let second = run_request(serde_json::from_value(raw).unwrap()).unwrap();
    assert!(uuid::Uuid::parse_str(&first.run_id).is_ok());
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.scores, second.scores);
}

#[test]
fn low_consistency_is_a_warning_not_an_error() {
    let raw = json!({
        "criteria": [
            {"id": "a", "name": "A", "polarity": "higher_is_better"},
            {"id": "b", "name": "B", "polarity": "higher_is_better"},
            {"id": "c", "name": "C", "polarity": "higher_is_better"}
        ],
        "stakeholder_submissions": [
            {"stakeholder_id": "erratic", "role": "pm", "judgments": [
                {"criterion_a_id": "a", "criterion_b_id": "b", "value": 9},
                {"criterion_a_id": "b", "criterion_b_id": "c", "value": 9},
                {"criterion_a_id": "c", "criterion_b_id": "a", "value": 9}
            ]}
        ]
    });
    let req: RunRequest = serde_json::from_value(raw).unwrap();
    let derived = weights_request(&req).unwrap();
    assert!(!derived.consistency.is_acceptable);
    assert!(derived.warnings.iter().any(|w| matches!(
        w,
        QvfWarning::LowConsistency { scope, .. } if scope == "consensus"
    )));
    assert!(derived.warnings.iter().any(|w| matches!(
        w,
        QvfWarning::LowConsistency { scope, .. } if scope == "erratic"
    )));
    let sum: f64 = derived.consensus_weights.weights.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
}

#[test]
fn structural_errors_abort_the_run() {
    let mut raw = request();
    raw["role_weights"] = json!({"product": 2.0});
    let req: RunRequest = serde_json::from_value(raw).unwrap();
    let err = run_request(req).unwrap_err();
    assert!(matches!(err, QvfError::Ahp(qvf_core::AhpError::MissingRoleWeight { .. })));

    let mut raw = request();
    raw["items"][1]["item_id"] = json!("beta");
    let req: RunRequest = serde_json::from_value(raw).unwrap();
    assert!(matches!(run_request(req), Err(QvfError::Scoring(_))));
}

#[test]
fn uneven_consensus_round_trips_exactly() {
    let raw = json!({
        "run_id": "uneven",
        "criteria": [
            {"id": "a", "name": "A", "polarity": "higher_is_better"},
            {"id": "b", "name": "B", "polarity": "lower_is_better"},
            {"id": "c", "name": "C", "polarity": "higher_is_better"}
        ],
        "stakeholder_submissions": [
            {"stakeholder_id": "s1", "role": "pm", "judgments": [
                {"criterion_a_id": "a", "criterion_b_id": "b", "value": 7},
                {"criterion_a_id": "a", "criterion_b_id": "c", "value": 3},
                {"criterion_a_id": "b", "criterion_b_id": "c", "value": 0.2}
            ]},
            {"stakeholder_id": "s2", "role": "eng", "judgments": [
                {"criterion_a_id": "a", "criterion_b_id": "b", "value": 5},
                {"criterion_a_id": "a", "criterion_b_id": "c", "value": 0.14285714285714285},
                {"criterion_a_id": "b", "criterion_b_id": "c", "value": 6}
            ]}
        ],
        "items": [
            {"item_id": "x", "raw_values": {"a": 3.7, "b": 12.1, "c": 0.3}},
            {"item_id": "y", "raw_values": {"a": 1.1, "b": 4.9}},
            {"item_id": "z", "raw_values": {"a": 9.25, "b": 7.3, "c": 2.9}}
        ]
    });
    let out = run_request(serde_json::from_value(raw).unwrap()).unwrap();
    let text = serde_json::to_string(&out).unwrap();
    let back: QvfRunOutput = serde_json::from_str(&text).unwrap();
    assert_eq!(back, out);
}

#[test]
fn malformed_matrix_keeps_its_error() {
    let mut raw = request();
    raw["stakeholder_submissions"][1]["comparison_matrix"]["values"] = json!([[1, 3], [3, 1]]);
    let req: RunRequest = serde_json::from_value(raw).unwrap();
    let err = run_request(req).unwrap_err();
    assert!(matches!(
        err,
        QvfError::Ahp(qvf_core::AhpError::NonReciprocal { row: 1, col: 0, .. })
    ));
    assert!(err.to_string().contains("not reciprocal"));
}
