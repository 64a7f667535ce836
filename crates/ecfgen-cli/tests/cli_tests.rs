//! Integration tests for the ecfgen CLI.
//!
//! These tests run the actual binary against YAML files in a temp dir.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BASIC: &str = r#"
suite1:
  edits:
    VAR: "1"
  fam1:
    tasks:
      t1:
        events: [release]
      t2:
        triggers:
          - task: t1
"#;

const CONFLICT: &str = r#"
broken:
  tasks:
    t1:
      triggers:
        - a == complete
        - b == complete
fine:
  tasks:
    t2:
"#;

fn ecfgen_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ecfgen").unwrap();
    cmd.env_remove("ECFGEN_CONFIG")
        .env_remove("ECFGEN_SAVEDIR")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help_flag() {
    ecfgen_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ecFlow"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_build_prints_definition() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "ecflow_build.yml", BASIC);

    ecfgen_cmd()
        .args(["build", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# generated by ecfgen"))
        .stdout(predicate::str::contains("suite suite1\n  edit VAR '1'\n"))
        .stdout(predicate::str::contains("  family fam1\n    task t1\n      event release\n"))
        .stdout(predicate::str::contains("    task t2\n      trigger t1 == complete\n"))
        .stdout(predicate::str::contains("endfamily"))
        .stdout(predicate::str::contains("endsuite"));
}

#[test]
fn test_build_uses_default_config_in_current_dir() {
    let temp_dir = TempDir::new().unwrap();
    write_config(&temp_dir, "ecflow_build.yml", BASIC);

    ecfgen_cmd()
        .current_dir(temp_dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("suite suite1"));
}

#[test]
fn test_build_writes_savedir() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "suites.yml", BASIC);
    let out_dir = temp_dir.path().join("out/defs");

    ecfgen_cmd()
        .args(["build", "--config", config.to_str().unwrap()])
        .args(["--savedir", out_dir.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ecflow.def"));

    let written = fs::read_to_string(out_dir.join("ecflow.def")).unwrap();
    assert!(written.contains("suite suite1"));
    assert!(written.contains("task t1"));
}

#[test]
fn test_build_json_format() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "suites.yml", BASIC);

    let output = ecfgen_cmd()
        .args(["build", "--format", "json", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["suites"][0]["name"], "suite1");
    assert_eq!(json["suites"][0]["kind"], "suite");
    assert_eq!(json["suites"][0]["children"][0]["name"], "fam1");
}

#[test]
fn test_build_merges_configs_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let base = write_config(&temp_dir, "base.yml", "s1:\n  tasks: {a: }\n");
    let extra = write_config(&temp_dir, "extra.yml", "s2:\n  tasks: {b: }\n");

    ecfgen_cmd()
        .env(
            "ECFGEN_CONFIG",
            format!("{},{}", base.display(), extra.display()),
        )
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("suite s1"))
        .stdout(predicate::str::contains("suite s2"));
}

#[test]
fn test_build_conflict_fails_but_keeps_other_suites() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "conflict.yml", CONFLICT);

    ecfgen_cmd()
        .args(["build", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("suite fine"))
        .stdout(predicate::str::contains("suite broken").not())
        .stderr(predicate::str::contains("1 of 2 suite(s) failed"));
}

#[test]
fn test_validate_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "suites.yml", BASIC);

    ecfgen_cmd()
        .args(["validate", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok      suite1"))
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_reports_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "conflict.yml", CONFLICT);

    ecfgen_cmd()
        .args(["validate", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED  broken"))
        .stdout(predicate::str::contains("a == complete"))
        .stdout(predicate::str::contains("ok      fine"));
}

#[test]
fn test_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yml");

    ecfgen_cmd()
        .args(["validate", "--config", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_invalid_yaml_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "bad.yml", "suites: [a, b]\n");

    ecfgen_cmd()
        .args(["build", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("suites"));
}

#[test]
fn test_tree_lists_nodes() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "suites.yml", BASIC);

    ecfgen_cmd()
        .args(["tree", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("suite1 [suite] suite suite1"))
        .stdout(predicate::str::contains("  fam1 [family] family suite1/fam1"))
        .stdout(predicate::str::contains("    tasks [tasks]\n"))
        .stdout(predicate::str::contains("t2 [family] task suite1/fam1/t2"));
}
