// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const CYCLE: &str = "\
name: cycle
schedule: 1d
start_date: 2021-01-01
tasks:
  - id: a
    command: date
    depends_on: [c]
  - id: b
    command: date
    depends_on: [a]
  - id: c
    command: date
    depends_on: [b]
";

fn flowdef(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flowdef").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn init(dir: &Path) {
    flowdef(dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created flowdef.yaml"));
}

#[test]
fn init_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .args(["validate", "flowdef.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Definition is valid!"));
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    flowdef(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn render_uses_run_date() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .args(["render", "flowdef.yaml", "templated", "--date", "2021-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo \"2021-06-01\""))
        .stdout(predicate::str::contains("echo \"2021-06-08\""));
}

#[test]
fn render_unknown_task_fails() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .args(["render", "flowdef.yaml", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn export_json_handoff() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    let output = flowdef(dir.path())
        .args(["export", "flowdef.yaml", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let handoff: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(handoff["pipeline"], "example_pipeline");
    assert_eq!(handoff["order"][0], "print_date");
    assert_eq!(handoff["fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(handoff["tasks"][1]["params"]["retries"], 3);
}

#[test]
fn cyclic_definition_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cycle.yaml"), CYCLE).unwrap();

    flowdef(dir.path())
        .args(["validate", "cycle.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

#[test]
fn graph_formats() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .args(["graph", "flowdef.yaml", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("print_date --> sleep"));

    flowdef(dir.path())
        .args(["graph", "flowdef.yaml", "-f", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph \"example_pipeline\""));
}

#[test]
fn list_reports_definitions() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    flowdef(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("example_pipeline"))
        .stdout(predicate::str::contains("3 tasks"));
}

#[test]
fn config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    std::fs::write(
        dir.path().join("flowdef.toml"),
        "[definitions]\nmax_repeat = 2\n",
    )
    .unwrap();

    flowdef(dir.path())
        .args(["render", "flowdef.yaml", "templated"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("repeat limit"));
}

#[test]
fn missing_file_points_at_init() {
    let dir = tempfile::tempdir().unwrap();

    flowdef(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("flowdef init"));
}
