//! CLI tests for the sg binary

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Command isolated from the user's config and log directories
fn sg(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sg").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_config_prints_defaults() {
    let home = TempDir::new().unwrap();
    sg(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("orphan-timeout-ms: 2000"))
        .stdout(predicate::str::contains("allowed-roles:"))
        .stdout(predicate::str::contains("superadmin"));
}

#[test]
fn test_config_reads_project_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".sessiongate.yml"), "customer:\n  orphan-timeout-ms: 900\n").unwrap();

    sg(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("orphan-timeout-ms: 900"));
}

#[test]
fn test_invalid_config_rejected() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("zero.yml");
    std::fs::write(&path, "notices:\n  capacity: 0\n").unwrap();

    sg(&home)
        .args(["--config", path.to_str().unwrap(), "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_run_text_report() {
    let home = TempDir::new().unwrap();
    sg(&home)
        .arg("run")
        .arg(fixture("orphan.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario: orphaned customer (customer)"))
        .stdout(predicate::str::contains("login ana@example.com"))
        .stdout(predicate::str::contains("ready"))
        .stdout(predicate::str::contains("recovered: profile_missing"))
        .stdout(predicate::str::contains("recoveries=1"));
}

#[test]
fn test_run_json_report() {
    let home = TempDir::new().unwrap();
    let output = sg(&home)
        .args(["run", "--format", "json"])
        .arg(fixture("admin.yml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["variant"], "admin");

    let steps = report["steps"].as_array().unwrap();
    let waited = &steps[2];
    assert_eq!(waited["snapshot"]["identity"], serde_json::Value::Null);
    assert_eq!(waited["notices"][0]["reason"], "access_denied");

    let last = steps.last().unwrap();
    assert_eq!(last["snapshot"]["profile"]["role"], "superadmin");

    let audit = report["audit"].as_array().unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0]["action"], "ACCESS_DENY");
    assert_eq!(audit[1]["action"], "ACCESS_ALLOW");
}

#[test]
fn test_run_writes_log_file() {
    let home = TempDir::new().unwrap();
    sg(&home).arg("run").arg(fixture("orphan.yml")).assert().success();

    let log = home.path().join("data").join("sessiongate").join("logs").join("sessiongate.log");
    let content = std::fs::read_to_string(log).unwrap();
    assert!(content.contains("Logging initialized"));
}

#[test]
fn test_run_missing_scenario_fails() {
    let home = TempDir::new().unwrap();
    sg(&home)
        .args(["run", "does-not-exist.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scenario"));
}

#[test]
fn test_run_bad_step_fails() {
    let home = TempDir::new().unwrap();
    sg(&home)
        .arg("run")
        .arg(fixture("bad.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse scenario"));
}
