//! Staged binary replacement with a one-generation backup.
//!
//! An update swaps `update_path` into `binary_path` by renaming, keeps the
//! previous binary at `binary_path.bak`, and launches the new binary once.
//! If the swap or that launch fails, the backup is renamed back so the next
//! loop iteration runs the previous binary again.

use crate::context::SupervisorContext;
use crate::launcher::{ChildOutcome, Launcher};
use async_trait::async_trait;
use keeper_common::ProcessError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum UpdateError {
    /// Could not move the current binary aside. Nothing else was touched.
    #[error("Failed to back up {} to {}: {source}", .binary.display(), .backup.display())]
    Backup {
        binary: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Could not move the staged update into place; previous binary restored.
    #[error("Failed to move staged update {} to {}: {source}", .update.display(), .binary.display())]
    Swap {
        update: PathBuf,
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The new binary did not start; previous binary restored.
    #[error("Updated binary {} failed to launch: {source}", .binary.display())]
    Launch {
        binary: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Restoring the backup failed. `binary` may now be missing or broken.
    #[error("Rollback failed, {} was not restored from {}: {source}", .binary.display(), .backup.display())]
    RollbackFailed {
        binary: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UpdateError {
    /// `true` when no valid binary is known to remain.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpdateError::RollbackFailed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No staged update was present.
    NoUpdate,
    /// The update was swapped in and its validation launch ran to exit.
    Applied,
    /// A stop arrived while the update was being validated.
    Interrupted,
}

/// The rename primitive the updater moves binaries with.
#[async_trait]
pub trait Rename: Send + Sync + fmt::Debug {
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Plain `rename(2)` through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRename;

#[async_trait]
impl Rename for FsRename {
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }
}

#[derive(Debug, Clone)]
pub struct Updater {
    binary_path: PathBuf,
    backup_path: PathBuf,
    update_path: Option<PathBuf>,
    cooldown: Duration,
    renamer: Arc<dyn Rename>,
}

impl Updater {
    pub fn new(context: &SupervisorContext) -> Self {
        Self {
            binary_path: context.binary_path.clone(),
            backup_path: context.backup_path(),
            update_path: context
                .update_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            cooldown: context.retry_interval,
            renamer: Arc::new(FsRename),
        }
    }

    /// Replace the rename primitive.
    pub fn with_renamer(mut self, renamer: Arc<dyn Rename>) -> Self {
        self.renamer = renamer;
        self
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Staged update path, if one is configured and a regular file exists there.
    pub async fn staged_update(&self) -> Option<&Path> {
        let path = self.update_path.as_deref()?;
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                debug!("Staged update path {} is a directory, ignoring", path.display());
                None
            }
            Ok(_) => Some(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot inspect staged update {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Adopt the staged update if there is one.
    pub async fn check_and_apply(&self, launcher: &Launcher) -> Result<UpdateOutcome, UpdateError> {
        let Some(update) = self.staged_update().await else {
            return Ok(UpdateOutcome::NoUpdate);
        };

        info!(
            "Applying staged update {} -> {}",
            update.display(),
            self.binary_path.display()
        );

        match fs::remove_file(&self.backup_path).await {
            Ok(()) => debug!("Removed previous backup {}", self.backup_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove previous backup {}: {}",
                self.backup_path.display(),
                e
            ),
        }

        self.renamer
            .rename(&self.binary_path, &self.backup_path)
            .await
            .map_err(|source| UpdateError::Backup {
                binary: self.binary_path.clone(),
                backup: self.backup_path.clone(),
                source,
            })?;

        if let Err(source) = self.renamer.rename(update, &self.binary_path).await {
            self.restore_backup().await?;
            discard(update).await;
            return Err(UpdateError::Swap {
                update: update.to_path_buf(),
                binary: self.binary_path.clone(),
                source,
            });
        }

        let child = match launcher.spawn(&self.binary_path) {
            Ok(Some(child)) => child,
            Ok(None) => return Ok(UpdateOutcome::Interrupted),
            Err(source) => {
                discard(&self.binary_path).await;
                self.restore_backup().await?;
                return Err(UpdateError::Launch {
                    binary: self.binary_path.clone(),
                    source,
                });
            }
        };

        info!(
            "Updated binary {} started (PID: {})",
            self.binary_path.display(),
            child.pid()
        );

        match launcher.supervise(child).await {
            Ok(ChildOutcome::Exited(_)) => {}
            Ok(ChildOutcome::Killed) => return Ok(UpdateOutcome::Interrupted),
            Err(e) => warn!("Validation launch of updated binary: {}", e),
        }

        if !launcher.shutdown().sleep(self.cooldown).await {
            return Ok(UpdateOutcome::Interrupted);
        }

        Ok(UpdateOutcome::Applied)
    }

    async fn restore_backup(&self) -> Result<(), UpdateError> {
        match self.renamer.rename(&self.backup_path, &self.binary_path).await {
            Ok(()) => {
                info!("Restored previous binary {}", self.binary_path.display());
                Ok(())
            }
            Err(source) => {
                error!(
                    "Could not restore {} from {}: {}",
                    self.binary_path.display(),
                    self.backup_path.display(),
                    source
                );
                Err(UpdateError::RollbackFailed {
                    binary: self.binary_path.clone(),
                    backup: self.backup_path.clone(),
                    source,
                })
            }
        }
    }
}

/// Remove a file that is being rolled back, ignoring an already missing one.
async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rollback_failure_is_fatal() {
        let io_err = || io::Error::new(io::ErrorKind::PermissionDenied, "denied");

        let rollback = UpdateError::RollbackFailed {
            binary: PathBuf::from("/opt/app/server"),
            backup: PathBuf::from("/opt/app/server.bak"),
            source: io_err(),
        };
        assert!(rollback.is_fatal());
        assert!(rollback.to_string().contains("/opt/app/server.bak"));

        let swap = UpdateError::Swap {
            update: PathBuf::from("/opt/app/server.new"),
            binary: PathBuf::from("/opt/app/server"),
            source: io_err(),
        };
        assert!(!swap.is_fatal());

        let launch = UpdateError::Launch {
            binary: PathBuf::from("/opt/app/server"),
            source: ProcessError::spawn_failed("/opt/app/server", "Permission denied"),
        };
        assert!(!launch.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_update_path_is_ignored() {
        let ctx = SupervisorContext::new("/opt/app/server", "/opt/app").with_update_path("");
        let updater = Updater::new(&ctx);
        assert!(updater.staged_update().await.is_none());
    }
}
