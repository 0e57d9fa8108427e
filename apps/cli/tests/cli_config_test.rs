//! Integration tests for the `qcc-cli config` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

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
fn test_config_defaults() {
    let temp_dir = TempDir::new().unwrap();

    qcc(&temp_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("qubits = 8").and(predicate::str::contains("output = \"stdout\"")));
}

#[test]
fn test_config_layering() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".qcc")).unwrap();
    fs::write(temp_dir.path().join(".qcc").join("config.toml"), "[backend]\nqubits = 12\nmemory_limit_mb = 64\n").unwrap();
    fs::write(temp_dir.path().join(".qccrc"), "[backend]\nqubits = 6\n").unwrap();

    qcc(&temp_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("qubits = 6").and(predicate::str::contains("memory_limit_mb = 64")));

    qcc(&temp_dir)
        .env("QCC_QUBITS", "5")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("qubits = 5"));
}

#[test]
fn test_local_file_can_restore_defaults() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".qcc")).unwrap();
    fs::write(
        temp_dir.path().join(".qcc").join("config.toml"),
        "[backend]\nqubits = 12\n\n[diagnostics]\ndisable_default_sink = false\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join(".qccrc"), "[backend]\nqubits = 8\n\n[diagnostics]\ndisable_default_sink = true\n")
        .unwrap();

    qcc(&temp_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("qubits = 8").and(predicate::str::contains("disable_default_sink = true")));
}

#[test]
fn test_explicit_config_file_can_restore_defaults() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".qccrc"), "[output]\nformat = \"json\"\n").unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    fs::write(&explicit, "[output]\nformat = \"human\"\n").unwrap();

    qcc(&temp_dir)
        .arg("--config")
        .arg(&explicit)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("format = \"human\""));
}

#[test]
fn test_config_rejects_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".qccrc"), "backend = [").unwrap();

    qcc(&temp_dir)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_config_rejects_unknown_log_level() {
    let temp_dir = TempDir::new().unwrap();

    qcc(&temp_dir)
        .arg("--log-level")
        .arg("loud")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level"));
}
