//! Signal listener against signals raised in this test process.
//!
//! Handlers are process-wide, so everything runs in a single test.

#![cfg(unix)]

use keeper_supervisor::SignalListener;
use nix::sys::signal::{raise, Signal};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn hangup_is_ignored_and_terminate_signals_end_the_wait() {
    let mut listener = SignalListener::install().unwrap();

    raise(Signal::SIGHUP).unwrap();
    let waited =
        tokio::time::timeout(Duration::from_millis(300), listener.wait_for_termination()).await;
    assert!(waited.is_err(), "SIGHUP must not end the wait");

    raise(Signal::SIGTERM).unwrap();
    let name = tokio::time::timeout(Duration::from_secs(5), listener.wait_for_termination())
        .await
        .expect("SIGTERM should end the wait");
    assert_eq!(name, "SIGTERM");

    raise(Signal::SIGINT).unwrap();
    let name = tokio::time::timeout(Duration::from_secs(5), listener.wait_for_termination())
        .await
        .expect("SIGINT should end the wait");
    assert_eq!(name, "SIGINT");
}
