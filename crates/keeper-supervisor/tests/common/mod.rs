//! Shared helpers for keeper-supervisor integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keeper_process::StdioMode;
use keeper_supervisor::{FsRename, Rename, SupervisorContext};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const RETRY: Duration = Duration::from_millis(50);

/// Write an executable `/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Write a file that is not executable.
pub fn write_plain(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    path
}

/// Context with fast timings and silenced child output.
pub fn fast_context(binary: &Path, work_dir: &Path) -> SupervisorContext {
    SupervisorContext::new(binary, work_dir)
        .with_timing(Duration::ZERO, RETRY)
        .with_stdio(StdioMode::Null)
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Poll `predicate` every 10ms until it holds or `timeout` expires.
pub async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) {
    let result = tokio::time::timeout(timeout, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if result.is_err() {
        panic!("condition not met within {:?}", timeout);
    }
}

/// Renames through the filesystem, except that any move onto `target` fails.
#[derive(Debug)]
pub struct RenameOntoFails {
    pub target: PathBuf,
}

#[async_trait]
impl Rename for RenameOntoFails {
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to == self.target {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "rename refused"));
        }
        FsRename.rename(from, to).await
    }
}
