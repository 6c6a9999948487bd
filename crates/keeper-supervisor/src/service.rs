//! Service lifecycle callbacks.
//!
//! The host that runs the watchdog (an OS service manager, or the foreground
//! runner in the `keeper` binary) drives it through [`ServiceLifecycle`].

use crate::config::KeeperConfig;
use crate::context::SupervisorContext;
use crate::error::{KeeperError, Result};
use crate::shutdown::Shutdown;
use crate::signals::SignalListener;
use crate::supervisor::Supervisor;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Callbacks a service host invokes. Both must return promptly.
#[async_trait]
pub trait ServiceLifecycle: Send + Sync {
    /// Begin supervising in the background.
    async fn on_start(&self) -> Result<()>;

    /// Request shutdown without waiting for teardown to finish.
    async fn on_stop(&self) -> Result<()>;
}

/// How the watchdog presents itself to a service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub arguments: Vec<String>,
}

impl ServiceDescriptor {
    pub fn from_config(config: &KeeperConfig) -> Self {
        Self {
            name: config.name.clone(),
            display_name: format!("Service Keeper of {}", config.name),
            description: format!(
                "Keeps {} running and adopts staged updates",
                config.binary_path.display()
            ),
            arguments: config.arguments.clone(),
        }
    }
}

/// The watchdog service: one supervisor plus, optionally, a signal listener.
pub struct Keeper {
    descriptor: ServiceDescriptor,
    context: Arc<SupervisorContext>,
    shutdown: Shutdown,
    handle_signals: bool,
    supervisor: Mutex<Option<JoinHandle<Result<()>>>>,
    started: AtomicBool,
}

impl Keeper {
    pub fn new(descriptor: ServiceDescriptor, context: SupervisorContext) -> Self {
        Self {
            descriptor,
            context: Arc::new(context),
            shutdown: Shutdown::new(),
            handle_signals: true,
            supervisor: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &KeeperConfig) -> Result<Self> {
        let context = SupervisorContext::from_config(config)?;
        Ok(Self::new(ServiceDescriptor::from_config(config), context))
    }

    /// Whether `on_start` installs the SIGINT/SIGTERM listener (on by default).
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Wait for the supervisor to finish and return its result.
    pub async fn wait(&self) -> Result<()> {
        let handle = self.supervisor.lock().take().ok_or(KeeperError::NotStarted)?;
        handle
            .await
            .map_err(|e| KeeperError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ServiceLifecycle for Keeper {
    async fn on_start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(KeeperError::AlreadyStarted);
        }

        info!("Starting {}", self.descriptor.display_name);

        if self.handle_signals {
            let listener = SignalListener::install().map_err(KeeperError::Signals)?;
            tokio::spawn(listener.run(self.shutdown.clone()));
        }

        let supervisor = Supervisor::new(Arc::clone(&self.context), self.shutdown.clone());
        *self.supervisor.lock() = Some(tokio::spawn(supervisor.run()));
        Ok(())
    }

    async fn on_stop(&self) -> Result<()> {
        info!("Stopping {}", self.descriptor.display_name);
        self.shutdown.request_stop();
        Ok(())
    }
}
