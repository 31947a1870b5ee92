//! CLI integration tests for specdeck
//!
//! These tests drive the binary against real task files, including nested
//! `$ref` files and a tracked session in a scratch git repository.

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Get a command instance for the specdeck binary
fn specdeck_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("specdeck"))
}

const ROOT_TASKS: &str = r#"{
  // Root task list
  "version": 2,
  "tasks": [
    { "id": "1", "section": "Setup", "description": "Scaffold", "status": "pending" },
    { "id": "2", "section": "API", "description": "Build API", "status": "pending",
      "children": "$ref:api/tasks.jsonc" }
  ]
}
"#;

const CHILD_TASKS: &str = r#"{
  "version": 2,
  "parent": "2",
  "tasks": [
    { "id": "2.1", "description": "Routes", "status": "pending" },
    { "id": "2.2", "description": "Handlers", "status": "pending" }
  ]
}
"#;

/// Create a root task file with one referenced child file
fn setup_tasks() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("api")).unwrap();
    fs::write(dir.path().join("tasks.jsonc"), ROOT_TASKS).unwrap();
    fs::write(dir.path().join("api/tasks.jsonc"), CHILD_TASKS).unwrap();
    dir
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn status_of(file: &Value, id: &str) -> String {
    file["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == id)
        .map(|t| t["status"].as_str().unwrap().to_string())
        .unwrap()
}

// =============================================================================
// Task Commands
// =============================================================================

#[test]
fn test_task_start_updates_root_file() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "start", "tasks.jsonc", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task 1 is now in_progress"));

    let root = read_json(&dir.path().join("tasks.jsonc"));
    assert_eq!(status_of(&root, "1"), "in_progress");
    assert_eq!(status_of(&root, "2"), "pending");
}

#[test]
fn test_nested_done_propagates_to_parent() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "done", "tasks.jsonc", "2.1"])
        .assert()
        .success();

    let root = read_json(&dir.path().join("tasks.jsonc"));
    let child = read_json(&dir.path().join("api/tasks.jsonc"));
    assert_eq!(status_of(&child, "2.1"), "completed");
    assert_eq!(status_of(&root, "2"), "in_progress");

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "set", "tasks.jsonc", "2.2", "completed"])
        .assert()
        .success();

    let root = read_json(&dir.path().join("tasks.jsonc"));
    assert_eq!(status_of(&root, "2"), "completed");
}

#[test]
fn test_task_set_rejects_unknown_status() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "set", "tasks.jsonc", "1", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid task status 'done'"));
}

#[test]
fn test_task_set_unknown_id_fails() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "start", "tasks.jsonc", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task '9' not found"));
}

#[test]
fn test_missing_task_file_fails() {
    let dir = TempDir::new().unwrap();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "status", "nope.jsonc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task file not found"));
}

#[test]
fn test_task_list_shows_tree() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "list", "tasks.jsonc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ ] 2  Build API"))
        .stdout(predicate::str::contains("  [ ] 2.1  Routes"));
}

#[test]
fn test_task_list_json() {
    let dir = setup_tasks();

    let output = specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "list", "tasks.jsonc", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let nodes: Value = serde_json::from_str(stdout.trim()).unwrap();
    let nodes = nodes.as_array().unwrap();

    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[2]["id"], "2.1");
    assert_eq!(nodes[2]["depth"], 1);
}

#[test]
fn test_task_status_summary() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "done", "tasks.jsonc", "1"])
        .assert()
        .success();

    specdeck_cmd()
        .current_dir(dir.path())
        .args(["task", "status", "tasks.jsonc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tasks.jsonc: in_progress"))
        .stdout(predicate::str::contains(
            "1/2 tasks completed (0 in progress, 1 pending)",
        ));
}

// =============================================================================
// Track Command
// =============================================================================

#[test]
fn test_track_already_complete_exits() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tasks.jsonc"),
        r#"{ "version": 2, "tasks": [ { "id": "1", "status": "completed" } ] }"#,
    )
    .unwrap();

    specdeck_cmd()
        .current_dir(dir.path())
        .arg("track")
        .arg("tasks.jsonc")
        .args(["--id", "demo", "--repo"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already complete"));
}

#[test]
fn test_track_rejects_zero_debounce() {
    let dir = setup_tasks();

    specdeck_cmd()
        .current_dir(dir.path())
        .arg("track")
        .arg("tasks.jsonc")
        .args(["--id", "demo", "--debounce-ms", "0", "--repo"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_track_commits_completed_task() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }

    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "Test"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);

    let tasks = dir.path().join("tasks.jsonc");
    fs::write(
        &tasks,
        r#"{ "version": 2, "tasks": [ { "id": "1", "status": "pending" } ] }"#,
    )
    .unwrap();
    git(dir.path(), &["add", "tasks.jsonc"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);

    let mut child = Command::new(env!("CARGO_BIN_EXE_specdeck"))
        .current_dir(dir.path())
        .args(["track", "tasks.jsonc", "--id", "demo", "--debounce-ms", "50"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let first = lines.next().unwrap().unwrap();
    assert!(first.starts_with("Tracking change(demo)"), "{}", first);

    fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
    fs::write(
        &tasks,
        r#"{ "version": 2, "tasks": [ { "id": "1", "status": "completed" } ] }"#,
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(15);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("track did not finish");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());

    let message = git(dir.path(), &["log", "-1", "--format=%B"]);
    assert!(message.starts_with("change(demo): complete task 1"));
    assert!(message.contains("[Automated by specdeck track]"));

    let files = git(dir.path(), &["show", "--name-only", "--format=", "HEAD"]);
    assert_eq!(files.trim(), "main.rs");
    // The task file change itself stays uncommitted
    assert!(git(dir.path(), &["status", "--porcelain"]).contains("tasks.jsonc"));
}
