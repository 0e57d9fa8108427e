//! Integration tests for the `qcc-cli run` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const LINE_PATTERN: &str = r"^\[\d{2}:\d{2}:\d{2}(\.\d{7})? \+\d{2}:\d{2}:\d{2}(\.\d{7})?\] ";

/// Helper to write an experiment plan into the temp dir
fn write_plan(temp_dir: &TempDir, training_extra: &str, miss_rate: f64) -> PathBuf {
    let content = format!(
        r#"[training]
parameters = [0.0601, 3.1416, -1.5708, 0.7854]
bias = 0.0021
diagnostics = ["Epoch 1: loss 0.61", "Epoch 2: loss 0.42"]
duration_ms = 10
{training_extra}

[validation]
miss_rate = {miss_rate}
diagnostics = ["Validated 89 samples"]
"#
    );
    let path = temp_dir.path().join("plan.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Helper to build a command isolated from the user's config files
fn qcc(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qcc-cli").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env_remove("QCC_LOG_LEVEL")
        .env_remove("QCC_QUBITS")
        .env_remove("QCC_MEMORY_LIMIT_MB")
        .env_remove("QCC_DIAGNOSTICS");
    cmd
}

#[test]
fn test_run_prints_diagnostics_then_report() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, "", 0.0842);

    let output = qcc(&temp_dir).arg("run").arg(&plan).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "unexpected stdout: {stdout}");

    let pattern = predicate::str::is_match(LINE_PATTERN).unwrap();
    for line in &lines[..3] {
        assert!(pattern.eval(line), "not a timestamped line: {line}");
    }
    assert!(lines[0].ends_with("] Epoch 1: loss 0.61"));
    assert!(lines[1].ends_with("] Epoch 2: loss 0.42"));
    assert!(lines[2].ends_with("] Validated 89 samples"));
    assert_eq!(lines[3], "Observed miss rate of 8.42%.");
}

#[test]
fn test_run_without_diagnostics() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, "", 0.25);

    qcc(&temp_dir)
        .arg("run")
        .arg(&plan)
        .arg("--diagnostics")
        .arg("off")
        .assert()
        .success()
        .stdout(predicate::eq("Observed miss rate of 25.00%.\n"));
}

#[test]
fn test_run_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, "", 0.5);

    let output = qcc(&temp_dir).arg("run").arg(&plan).arg("--json").output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["validation"]["miss_rate"], 0.5);
    assert_eq!(report["training"]["parameters"].as_array().unwrap().len(), 4);
    assert_eq!(report["backend"], "local-statevector");
    assert!(report["run_id"].as_str().is_some());
}

#[test]
fn test_run_training_failure() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, r#"fail = "optimizer diverged""#, 0.1);

    qcc(&temp_dir)
        .arg("run")
        .arg(&plan)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Observed miss rate").not())
        .stderr(predicate::str::contains("Training failed").and(predicate::str::contains("optimizer diverged")));
}

#[test]
fn test_run_backend_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, "", 0.1);

    qcc(&temp_dir)
        .arg("run")
        .arg(&plan)
        .arg("--qubits")
        .arg("40")
        .arg("--memory-limit-mb")
        .arg("1")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Backend unavailable"));
}

#[test]
fn test_run_missing_plan() {
    let temp_dir = TempDir::new().unwrap();

    qcc(&temp_dir)
        .arg("run")
        .arg("missing.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load experiment plan"));
}

#[test]
fn test_run_uses_local_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let plan = write_plan(&temp_dir, "", 0.1);
    fs::write(temp_dir.path().join(".qccrc"), "[backend]\nqubits = 40\nmemory_limit_mb = 1\n").unwrap();

    qcc(&temp_dir)
        .arg("run")
        .arg(&plan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backend unavailable"));

    qcc(&temp_dir).arg("run").arg(&plan).arg("--qubits").arg("4").assert().success();
}
