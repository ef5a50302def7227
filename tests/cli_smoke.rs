use std::process::Command;

use serde_json::{json, Value};
use tempfile::tempdir;

fn qvf() -> Command {
    Command::new(env!("CARGO_BIN_EXE_qvf"))
}

fn read_json(path: &std::path::Path) -> Value {
    let raw = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn cli_preset_then_run() {
    let dir = tempdir().unwrap();
    let preset_path = dir.path().join("criteria.json");
    let status = qvf()
        .arg("preset")
        .arg("--out")
        .arg(&preset_path)
        .status()
        .unwrap();
    assert!(status.success());
    let criteria = read_json(&preset_path);
    assert_eq!(criteria.as_array().unwrap().len(), 5);

    let request = json!({
        "run_id": "cli-smoke",
        "criteria": criteria,
        "items": [
            {"item_id": "a", "raw_values": {"business_value": 8, "strategic_alignment": 3,
             "customer_value": 5, "implementation_complexity": 2, "risk": 1}},
            {"item_id": "b", "raw_values": {"business_value": 2, "strategic_alignment": 4,
             "customer_value": 1, "implementation_complexity": 8, "risk": 6}}
        ]
    });
    let input = dir.path().join("request.json");
    std::fs::write(&input, serde_json::to_string(&request).unwrap()).unwrap();
    let out = dir.path().join("output.json");

    let status = qvf()
        .arg("run")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let output = read_json(&out);
    assert_eq!(output["run_id"], "cli-smoke");
    assert_eq!(output["scores"][0]["item_id"], "a");
    assert_eq!(output["scores"][0]["rank"], 1);
}

#[test]
fn cli_check_reports_worst_judgment() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("matrix.json");
    let matrix = json!({
        "criterion_ids": ["a", "b", "c", "d"],
        "values": [
            [1, 2, 4, 0.125],
            [0.5, 1, 2, 4],
            [0.25, 0.5, 1, 2],
            [8, 0.25, 0.5, 1]
        ]
    });
    std::fs::write(&input, serde_json::to_string(&matrix).unwrap()).unwrap();

    let output = qvf()
        .arg("check")
        .arg("--input")
        .arg(&input)
        .args(["--limit", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["consistency"]["is_acceptable"], false);
    assert_eq!(report["most_inconsistent"].as_array().unwrap().len(), 1);
    assert_eq!(report["most_inconsistent"][0]["criterion_a_id"], "a");
    assert_eq!(report["most_inconsistent"][0]["criterion_b_id"], "d");
}

#[test]
fn cli_fails_on_incomplete_judgments() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("request.json");
    let request = json!({
        "criteria": [
            {"id": "a", "name": "A", "polarity": "higher_is_better"},
            {"id": "b", "name": "B", "polarity": "higher_is_better"},
            {"id": "c", "name": "C", "polarity": "higher_is_better"}
        ],
        "stakeholder_submissions": [
            {"stakeholder_id": "s1", "role": "pm", "judgments": [
                {"criterion_a_id": "a", "criterion_b_id": "b", "value": 2}
            ]}
        ]
    });
    std::fs::write(&input, serde_json::to_string(&request).unwrap()).unwrap();

    let output = qvf()
        .arg("weights")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("weights.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("incomplete comparisons"));
    assert!(!dir.path().join("weights.json").exists());
}
