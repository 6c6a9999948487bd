//! # Keeper Supervisor
//!
//! Single-child watchdog: launches one executable, restarts it whenever it
//! exits, and between restarts adopts a staged replacement binary with a
//! one-generation backup and automatic rollback.
//!
//! - [`config`] - YAML configuration, load-or-default and validation
//! - [`Supervisor`] - the restart loop
//! - [`Updater`] - staged update swap and rollback
//! - [`Shutdown`] - stop coordination and child tracking
//! - [`SignalListener`] - SIGINT/SIGTERM handling
//! - [`Keeper`] - service lifecycle callbacks

pub mod config;
pub mod context;
pub mod error;
pub mod launcher;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod supervisor;
pub mod updater;

pub use config::{ConfigError, KeeperConfig};
pub use context::SupervisorContext;
pub use error::{KeeperError, Result};
pub use launcher::{ChildOutcome, Launcher};
pub use service::{Keeper, ServiceDescriptor, ServiceLifecycle};
pub use shutdown::Shutdown;
pub use signals::SignalListener;
pub use supervisor::Supervisor;
pub use updater::{FsRename, Rename, UpdateError, UpdateOutcome, Updater};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
