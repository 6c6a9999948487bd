use crate::config::ConfigError;
use crate::updater::UpdateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the watchdog. Per-iteration failures (launch errors,
/// recoverable update errors) are logged by the loop and never surface here.
#[derive(Debug, Error)]
pub enum KeeperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot enter working directory {}: {source}", .path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failed update could not be rolled back.
    #[error("No valid binary after failed update rollback: {0}")]
    NoValidBinary(#[source] UpdateError),

    #[error("Failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("Service already started")]
    AlreadyStarted,

    #[error("Service not started")]
    NotStarted,

    #[error("Supervisor task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, KeeperError>;
