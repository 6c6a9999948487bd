//! Error types for process operations.
//!
//! `id` is whatever identifies the process to an operator at the point of
//! failure: the executable path before a spawn, the PID afterwards.

use thiserror::Error;

/// Process-level error raised by spawning, waiting on or killing a child.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process wait failed: {id} - {reason}")]
    WaitFailed { id: String, reason: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },
}

impl ProcessError {
    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn wait_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WaitFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
