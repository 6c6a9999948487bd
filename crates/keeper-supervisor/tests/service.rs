//! Service lifecycle callbacks.

#![cfg(unix)]

mod common;

use common::{fast_context, read_lines, wait_until, write_script};
use keeper_supervisor::{
    Keeper, KeeperConfig, KeeperError, ServiceDescriptor, ServiceLifecycle,
};
use std::path::PathBuf;
use std::time::Duration;

fn descriptor(name: &str) -> ServiceDescriptor {
    ServiceDescriptor::from_config(&KeeperConfig {
        name: name.to_string(),
        binary_path: PathBuf::from("/opt/app/server"),
        ..KeeperConfig::default()
    })
}

#[test]
fn descriptor_names_the_service() {
    let d = descriptor("api");
    assert_eq!(d.name, "api");
    assert_eq!(d.display_name, "Service Keeper of api");
    assert!(d.description.contains("/opt/app/server"));
}

#[tokio::test(flavor = "multi_thread")]
async fn start_runs_child_and_stop_ends_supervisor() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs.log");
    let binary = write_script(
        dir.path(),
        "app",
        &format!("echo run >> '{}'; exec sleep 30", log.display()),
    );

    let keeper = Keeper::new(descriptor("app"), fast_context(&binary, dir.path()))
        .with_signal_handling(false);

    keeper.on_start().await.unwrap();
    wait_until(Duration::from_secs(10), || keeper.shutdown().current_pid().is_some()).await;
    let pid = keeper.shutdown().current_pid().unwrap();

    keeper.on_stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), keeper.wait())
        .await
        .expect("supervisor should stop promptly")
        .unwrap();

    assert_eq!(read_lines(&log), vec!["run"]);
    assert!(!keeper_process::process_exists(pid).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "app", "exec sleep 30");
    let keeper = Keeper::new(descriptor("app"), fast_context(&binary, dir.path()))
        .with_signal_handling(false);

    keeper.on_start().await.unwrap();
    assert!(matches!(
        keeper.on_start().await,
        Err(KeeperError::AlreadyStarted)
    ));

    keeper.on_stop().await.unwrap();
    keeper.wait().await.unwrap();
}

#[tokio::test]
async fn wait_before_start_is_an_error() {
    let keeper = Keeper::new(
        descriptor("app"),
        keeper_supervisor::SupervisorContext::new("/bin/true", "/"),
    )
    .with_signal_handling(false);

    assert!(matches!(keeper.wait().await, Err(KeeperError::NotStarted)));
}

#[test]
fn from_config_defers_work_dir_check() {
    // The work dir is entered when the supervisor runs, not here.
    let config = KeeperConfig {
        binary_path: PathBuf::from("/bin/true"),
        work_dir: PathBuf::from("/nonexistent/keeper"),
        ..KeeperConfig::default()
    };
    let keeper = Keeper::from_config(&config).unwrap();
    assert_eq!(keeper.descriptor().display_name, "Service Keeper of keeper");
}
