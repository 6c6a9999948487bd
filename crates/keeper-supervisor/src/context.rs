//! Immutable supervisor context built once at startup.

use crate::config::{ConfigResult, KeeperConfig};
use keeper_process::{LaunchCommand, StdioMode};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the supervision loop and the updater need to know, resolved
/// from [`KeeperConfig`] and passed explicitly to each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorContext {
    pub binary_path: PathBuf,
    pub update_path: Option<PathBuf>,
    pub arguments: Vec<String>,
    pub work_dir: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub initial_delay: Duration,
    pub retry_interval: Duration,
    pub stdio: StdioMode,
}

impl SupervisorContext {
    /// Context with no arguments, no staged update, no initial delay and the
    /// default retry interval.
    pub fn new(binary_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            update_path: None,
            arguments: Vec::new(),
            work_dir: work_dir.into(),
            environment: BTreeMap::new(),
            initial_delay: Duration::ZERO,
            retry_interval: KeeperConfig::default().retry_interval(),
            stdio: StdioMode::Inherit,
        }
    }

    pub fn from_config(config: &KeeperConfig) -> ConfigResult<Self> {
        Ok(Self {
            binary_path: config.binary_path.clone(),
            update_path: config.staged_update().map(Path::to_path_buf),
            arguments: config.arguments.clone(),
            work_dir: config.resolve_work_dir()?,
            environment: config.environment.clone(),
            initial_delay: config.initial_delay(),
            retry_interval: config.retry_interval(),
            stdio: StdioMode::Inherit,
        })
    }

    pub fn with_update_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.update_path = Some(path.into());
        self
    }

    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timing(mut self, initial_delay: Duration, retry_interval: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Launch command for `binary_path`.
    pub fn launch_command(&self) -> LaunchCommand {
        LaunchCommand::new(&self.binary_path)
            .args(self.arguments.iter().cloned())
            .work_dir(&self.work_dir)
            .envs(&self.environment)
            .stdio(self.stdio)
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path_for(&self.binary_path)
    }
}

/// `binary` with `.bak` appended to the full file name.
pub fn backup_path_for(binary: &Path) -> PathBuf {
    let mut name = OsString::from(binary.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}
