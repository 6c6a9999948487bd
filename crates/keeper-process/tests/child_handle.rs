//! Integration tests for `ChildHandle` against real `/bin/sh` children.

#![cfg(unix)]

use keeper_common::ProcessError;
use keeper_process::{process_exists, ChildHandle, LaunchCommand, StdioMode};
use std::time::Duration;

fn sh(script: &str) -> LaunchCommand {
    LaunchCommand::new("/bin/sh")
        .args(["-c", script])
        .stdio(StdioMode::Null)
}

#[tokio::test]
async fn wait_reports_exit_code() {
    let mut child = ChildHandle::start(&sh("exit 3")).unwrap();
    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(child.exit_status(), Some(status));
    child.release();
}

#[tokio::test]
async fn kill_after_exit_is_noop() {
    let mut child = ChildHandle::start(&sh("exit 0")).unwrap();
    child.wait().await.unwrap();

    child.kill().await.unwrap();
    child.kill().await.unwrap();
    child.release();
}

#[tokio::test]
async fn kill_terminates_running_child() {
    let mut child = ChildHandle::start(&sh("sleep 30")).unwrap();
    let pid = child.pid();
    assert!(process_exists(pid).unwrap());

    tokio::time::timeout(Duration::from_secs(5), child.kill())
        .await
        .expect("kill should not hang")
        .unwrap();

    let status = child.exit_status().expect("status recorded after kill");
    assert!(!status.success());
    assert!(!process_exists(pid).unwrap());

    // Killing twice must be harmless.
    child.kill().await.unwrap();
    child.release();
}

#[tokio::test]
async fn kill_reaps_child_that_exited_unobserved() {
    let mut child = ChildHandle::start(&sh("exit 0")).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    child.kill().await.unwrap();
    assert_eq!(child.exit_status().and_then(|s| s.code()), Some(0));
}

#[tokio::test]
async fn start_missing_executable_fails() {
    let err = ChildHandle::start(&LaunchCommand::new("/nonexistent/keeper-test-binary"))
        .unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    assert!(err.to_string().contains("/nonexistent/keeper-test-binary"));
}

#[tokio::test]
async fn work_dir_and_env_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().canonicalize().unwrap();

    let command = sh("pwd > out.txt; printf '%s\\n' \"$KEEPER_TEST_VAR\" >> out.txt")
        .work_dir(&work_dir)
        .env("KEEPER_TEST_VAR", "hello");

    let mut child = ChildHandle::start(&command).unwrap();
    assert!(child.wait().await.unwrap().success());
    child.release();

    let out = std::fs::read_to_string(work_dir.join("out.txt")).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec![work_dir.to_str().unwrap(), "hello"]);
}

#[tokio::test]
async fn with_program_keeps_arguments() {
    let base = LaunchCommand::new("/bin/false").args(["-c", "exit 7"]);
    let command = base.with_program("/bin/sh").stdio(StdioMode::Null);

    let mut child = ChildHandle::start(&command).unwrap();
    assert_eq!(child.wait().await.unwrap().code(), Some(7));
}
