// SPDX-License-Identifier: MIT

//! End-to-end CLI integration tests against the `aof` binary, run against
//! an isolated `AOF_DATA_DIR` per test, exercised through the operator
//! surface rather than the library API.

use assert_cmd::Command;
use tempfile::tempdir;

fn aof(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("aof").expect("aof binary built");
    cmd.env("AOF_DATA_DIR", data_dir);
    cmd
}

#[test]
fn create_list_show_transition_round_trip() {
    let dir = tempdir().expect("tempdir");

    aof(dir.path())
        .args(["task", "create", "ship the release", "--priority", "high"])
        .assert()
        .success();

    let list_output = aof(dir.path())
        .args(["--output", "json", "task", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let tasks: serde_json::Value = serde_json::from_slice(&list_output).expect("valid json");
    let tasks = tasks.as_array().expect("array");
    assert_eq!(tasks.len(), 1);
    let id = tasks[0]["id"].as_str().expect("id").to_string();
    assert_eq!(tasks[0]["status"], "backlog");
    assert_eq!(tasks[0]["priority"], "high");

    aof(dir.path()).args(["task", "show", &id]).assert().success();

    aof(dir.path())
        .args(["task", "transition", &id, "ready"])
        .assert()
        .success();

    let list_output = aof(dir.path())
        .args(["--output", "json", "task", "list", "--status", "ready"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let tasks: serde_json::Value = serde_json::from_slice(&list_output).expect("valid json");
    assert_eq!(tasks.as_array().expect("array").len(), 1);
}

#[test]
fn transition_to_an_illegal_state_fails() {
    let dir = tempdir().expect("tempdir");
    aof(dir.path()).args(["task", "create", "a task"]).assert().success();

    let list_output = aof(dir.path())
        .args(["--output", "json", "task", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let tasks: serde_json::Value = serde_json::from_slice(&list_output).expect("valid json");
    let id = tasks[0]["id"].as_str().expect("id").to_string();

    // backlog -> done is not a legal edge.
    aof(dir.path()).args(["task", "transition", &id, "done"]).assert().failure();
}

#[test]
fn project_list_always_reports_the_inbox() {
    let dir = tempdir().expect("tempdir");
    let output = aof(dir.path())
        .args(["--output", "json", "project", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let projects: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    let projects = projects.as_array().expect("array");
    assert!(projects.iter().any(|p| p["id"] == "_inbox"));
}

#[test]
fn daemon_health_reports_not_running_without_a_daemon() {
    let dir = tempdir().expect("tempdir");
    let output = aof(dir.path())
        .args(["--output", "json", "daemon", "health"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(report["status"], "not_running");
}
