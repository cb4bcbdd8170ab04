//! E2E tests running the `carve` binary as a subprocess against JSON
//! snapshot fixtures in a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn carve_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("carve"));
    cmd.env("CARVE_LOG", "error");
    cmd
}

fn write_snapshot(dir: &Path, value: &Value) -> std::path::PathBuf {
    let path = dir.join("snapshot.json");
    std::fs::write(&path, serde_json::to_string_pretty(value).expect("serializes"))
        .expect("fixture written");
    path
}

fn basic_snapshot() -> Value {
    json!({
        "accounts": [
            { "id": "a1", "name": "Acme", "kind": "customer", "arr": 100.0 },
            { "id": "a2", "name": "Globex", "kind": "customer", "arr": 200.0 },
            { "id": "a3", "name": "Initech", "kind": "prospect", "arr": 0.0, "pipeline": 300.0 }
        ],
        "reps": [
            { "id": "r1", "name": "Riley" },
            { "id": "r2", "name": "Sam" }
        ]
    })
}

#[test]
fn batch_all_optimizes_each_kind_in_its_own_run() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());

    let output = carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01", "--json"])
        .output()
        .expect("runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Default batch is `all`: one outcome per account kind, never one
    // combined decision space.
    let by_batch: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let customer = by_batch["customer"]["proposals"]
        .as_array()
        .expect("customer proposals");
    let prospect = by_batch["prospect"]["proposals"]
        .as_array()
        .expect("prospect proposals");
    assert_eq!(customer.len(), 2);
    assert_eq!(prospect.len(), 1);
    assert_eq!(prospect[0]["account_id"], "a3");

    let mut ids: Vec<&str> = customer
        .iter()
        .chain(prospect.iter())
        .map(|p| p["account_id"].as_str().expect("account_id"))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a1", "a2", "a3"]);
    assert!(by_batch["customer"]["solver"]["backend"].as_str().is_some());
}

#[test]
fn optimize_human_output_has_sections() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());

    carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch: customer"))
        .stdout(predicate::str::contains("Batch: prospect"))
        .stdout(predicate::str::contains("Proposals"))
        .stdout(predicate::str::contains("Rep loads"))
        .stdout(predicate::str::contains("Metrics"));
}

#[test]
fn batch_filter_drops_other_kinds() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());

    let output = carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01", "--batch", "customer", "--json"])
        .output()
        .expect("runs");
    assert!(output.status.success());

    let outcome: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let proposals = outcome["proposals"].as_array().expect("proposals array");
    assert_eq!(proposals.len(), 2);
    assert!(proposals.iter().all(|p| p["account_id"] != "a3"));
}

#[test]
fn missing_input_exits_with_usage_code() {
    carve_cmd()
        .args(["optimize", "--input", "/nonexistent/snapshot.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("snapshot"));
}

#[test]
fn no_eligible_reps_exits_with_engine_code() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = json!({
        "accounts": [{ "id": "a1", "name": "Acme", "kind": "customer", "arr": 100.0 }],
        "reps": [{ "id": "r1", "name": "Riley", "active": false }]
    });
    let input = write_snapshot(dir.path(), &snapshot);

    carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("eligible"));
}

#[test]
fn invalid_config_exits_with_usage_code() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());
    let config = dir.path().join("carve.toml");
    std::fs::write(&config, "[balance]\nvariance_band_pct = 0.5\nbuffer_zone_pct = 0.4\n")
        .expect("fixture written");

    carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("buffer"));
}

#[test]
fn lp_prints_problem_text_without_solving() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());

    carve_cmd()
        .args(["lp", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01", "--batch", "customer"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Maximize"))
        .stdout(predicate::str::contains("Subject To"))
        .stdout(predicate::str::contains("x_a1_r1"))
        .stdout(predicate::str::contains("End"));
}

#[test]
fn lp_batch_all_prints_one_problem_per_kind() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());

    let output = carve_cmd()
        .args(["lp", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01"])
        .output()
        .expect("runs");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(text.matches("Maximize").count(), 2);
    assert!(text.contains("\\ batch: customer"));
    assert!(text.contains("\\ batch: prospect"));
    assert!(text.contains("x_a1_r1"));
    assert!(text.contains("x_a3_r1"));
}

#[test]
fn telemetry_flag_appends_a_run_record() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_snapshot(dir.path(), &basic_snapshot());
    let telemetry = dir.path().join("runs.jsonl");

    carve_cmd()
        .args(["optimize", "--input"])
        .arg(&input)
        .args(["--as-of", "2026-06-01", "--telemetry"])
        .arg(&telemetry)
        .assert()
        .success();

    // One record per batch run.
    let contents = std::fs::read_to_string(&telemetry).expect("telemetry file written");
    let records: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON"))
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["batch"], "customer");
    assert_eq!(records[0]["account_count"], 2);
    assert_eq!(records[1]["batch"], "prospect");
    assert_eq!(records[1]["account_count"], 1);
    assert!(records[0]["run_id"].as_str().is_some());
}
