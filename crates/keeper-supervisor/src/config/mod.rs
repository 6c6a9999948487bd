use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub mod validation;

/// Retry interval used when `retry_seconds` is left at zero.
pub const DEFAULT_RETRY_SECONDS: u64 = 5;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration existed; a default one was written at `path`.
    #[error("Configuration file {} was missing; a default was written there, edit it and restart", .path.display())]
    NeedsConfiguration { path: PathBuf },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write default config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot locate the keeper executable: {0}")]
    CurrentExe(#[source] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Watchdog configuration, read once at startup and never reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Service identifier, used for display naming only.
    #[serde(default = "default_name")]
    pub name: String,

    /// Executable the watchdog keeps running.
    #[serde(default)]
    pub binary_path: PathBuf,

    /// Staged replacement for `binary_path`, adopted between restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_path: Option<PathBuf>,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Child working directory; empty means the keeper executable's directory.
    #[serde(default)]
    pub work_dir: PathBuf,

    /// Extra variables layered over the inherited environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// One-time pause before the first launch.
    #[serde(default)]
    pub delay_seconds: u64,

    /// Pause after every child exit. Zero means [`DEFAULT_RETRY_SECONDS`].
    #[serde(default = "default_retry_seconds")]
    pub retry_seconds: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            binary_path: PathBuf::new(),
            update_path: None,
            arguments: Vec::new(),
            work_dir: PathBuf::new(),
            environment: BTreeMap::new(),
            delay_seconds: 0,
            retry_seconds: default_retry_seconds(),
            log_level: default_log_level(),
        }
    }
}

impl KeeperConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> ConfigResult<Self> {
        let config: KeeperConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or write a default configuration there if it does not exist.
    ///
    /// A freshly written default is never returned: the caller gets
    /// [`ConfigError::NeedsConfiguration`] so the service refuses to start
    /// until an operator has filled it in.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(_) => Self::load_from_file(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::default().write_to_file(path)?;
                warn!("Please fill in the configuration file: {}", path.display());
                Err(ConfigError::NeedsConfiguration {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Serialize to YAML at `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote configuration file: {}", path.display());
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validation::validate_config(self).map_err(ConfigError::Invalid)
    }

    /// Staged update path, treating an empty value as absent.
    pub fn staged_update(&self) -> Option<&Path> {
        self.update_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        match self.retry_seconds {
            0 => Duration::from_secs(DEFAULT_RETRY_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Working directory for the child: `work_dir`, or the directory holding
    /// the keeper executable when that is empty.
    pub fn resolve_work_dir(&self) -> ConfigResult<PathBuf> {
        if !self.work_dir.as_os_str().is_empty() {
            return Ok(self.work_dir.clone());
        }

        let exe = std::env::current_exe().map_err(ConfigError::CurrentExe)?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            ConfigError::Invalid(format!("{} has no parent directory", exe.display()))
        })
    }
}

/// Default config location: the keeper executable with its extension
/// replaced by `.yaml` (`/opt/keeper/keeper` -> `/opt/keeper/keeper.yaml`).
pub fn default_config_path() -> ConfigResult<PathBuf> {
    let exe = std::env::current_exe().map_err(ConfigError::CurrentExe)?;
    Ok(config_path_for(&exe))
}

fn config_path_for(exe: &Path) -> PathBuf {
    exe.with_extension("yaml")
}

fn default_name() -> String {
    "keeper".to_string()
}

fn default_retry_seconds() -> u64 {
    DEFAULT_RETRY_SECONDS
}

fn default_log_level() -> String {
    "info".to_string()
}
