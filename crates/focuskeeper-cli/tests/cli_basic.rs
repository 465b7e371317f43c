//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory and
//! inspects the JSON documents printed on stdout.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focuskeeper"))
        .args(args)
        .env("FOCUSKEEPER_HOME", home)
        .env_remove("FOCUSKEEPER_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Every JSON document on stdout, in order.
fn documents(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("stdout is a stream of JSON documents")
}

fn snapshot(stdout: &str) -> Value {
    let docs = documents(stdout);
    let last = docs.last().cloned().expect("at least one document");
    assert_eq!(last["type"], "StateSnapshot");
    last
}

#[test]
fn test_status_on_fresh_home() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(code, 0);

    let snap = snapshot(&stdout);
    assert_eq!(snap["mode"], "FOCUS");
    assert_eq!(snap["timeLeft"], 1500);
    assert_eq!(snap["isActive"], false);
    assert_eq!(snap["cycleNumber"], 1);
}

#[test]
fn test_start_persists_across_invocations() {
    let home = TempDir::new().unwrap();

    let (stdout, _, code) = run_cli(home.path(), &["timer", "start"]);
    assert_eq!(code, 0);
    let docs = documents(&stdout);
    assert_eq!(docs[0]["type"], "TimerStarted");
    assert_eq!(snapshot(&stdout)["isActive"], true);

    let (stdout, _, _) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(snapshot(&stdout)["isActive"], true);

    let (stdout, _, code) = run_cli(home.path(), &["timer", "pause"]);
    assert_eq!(code, 0);
    let snap = snapshot(&stdout);
    assert_eq!(snap["isActive"], false);
    assert!(snap["timeLeft"].as_u64().unwrap() <= 1500);
}

#[test]
fn test_quick_skip_moves_to_break_without_session() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["timer", "start"]);

    let (stdout, _, code) = run_cli(home.path(), &["timer", "skip"]);
    assert_eq!(code, 0);
    let docs = documents(&stdout);
    assert!(docs.iter().all(|d| d["type"] != "SessionSubmitted"));

    let snap = snapshot(&stdout);
    assert_eq!(snap["mode"], "SHORT_BREAK");
    assert_eq!(snap["cycleNumber"], 2);
    assert_eq!(snap["timeLeft"], 300);
}

#[test]
fn test_mode_and_duration() {
    let home = TempDir::new().unwrap();

    let (stdout, _, code) = run_cli(home.path(), &["timer", "mode", "long-break"]);
    assert_eq!(code, 0);
    assert_eq!(snapshot(&stdout)["timeLeft"], 900);

    let (stdout, _, code) = run_cli(home.path(), &["timer", "duration", "45"]);
    assert_eq!(code, 0);
    assert_eq!(snapshot(&stdout)["timeLeft"], 2700);

    let (_, stderr, code) = run_cli(home.path(), &["timer", "duration", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_mode_switch_refused_while_running() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["timer", "start"]);

    let (_, stderr, code) = run_cli(home.path(), &["timer", "mode", "stopwatch"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_rate_without_pending_session_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["timer", "rate", "4"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_subject_is_reported() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["timer", "subject", "History", "--task-id", "t-42"],
    );
    assert_eq!(code, 0);
    let snap = snapshot(&stdout);
    assert_eq!(snap["subject"], "History");
    assert_eq!(snap["taskId"], "t-42");
}

#[test]
fn test_debug_log_names_backend_endpoint() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_focuskeeper"))
        .args(["timer", "status"])
        .env("FOCUSKEEPER_HOME", home.path())
        .env("FOCUSKEEPER_LOG", "debug")
        .output()
        .expect("Failed to execute CLI command");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("session backend"));
    assert!(stderr.contains("http://localhost:5000/api/focus"));
}

#[test]
fn test_config_set_and_get() {
    let home = TempDir::new().unwrap();

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "backend.base_url"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "http://localhost:5000/api");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "timer.tick_interval_ms", "250"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "timer.tick_interval_ms"]);
    assert_eq!(stdout.trim(), "250");

    let (_, _, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("focuskeeper"));
}
