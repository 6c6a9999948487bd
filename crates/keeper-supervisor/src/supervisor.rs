//! The supervision loop.

use crate::context::SupervisorContext;
use crate::error::{KeeperError, Result};
use crate::launcher::Launcher;
use crate::shutdown::Shutdown;
use crate::updater::{UpdateOutcome, Updater};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Keeps one child running until a stop is requested, checking for a staged
/// update after every exit.
#[derive(Debug)]
pub struct Supervisor {
    context: Arc<SupervisorContext>,
    launcher: Launcher,
    updater: Updater,
    shutdown: Shutdown,
}

impl Supervisor {
    pub fn new(context: Arc<SupervisorContext>, shutdown: Shutdown) -> Self {
        let launcher = Launcher::new(&context, shutdown.clone());
        let updater = Updater::new(&context);
        Self {
            context,
            launcher,
            updater,
            shutdown,
        }
    }

    /// Use `updater` instead of the one built from the context.
    pub fn with_updater(mut self, updater: Updater) -> Self {
        self.updater = updater;
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Run until stopped. Only fatal conditions are returned as errors.
    pub async fn run(self) -> Result<()> {
        let result = self.run_loop().await;
        self.shutdown.mark_stopped();
        match &result {
            Ok(()) => info!("Supervisor stopped"),
            Err(e) => error!("Supervisor stopped on fatal error: {}", e),
        }
        result
    }

    async fn run_loop(&self) -> Result<()> {
        let ctx = &self.context;
        info!(
            "Supervising {} (work dir: {}, retry: {:?})",
            ctx.binary_path.display(),
            ctx.work_dir.display(),
            ctx.retry_interval
        );

        if !self.shutdown.sleep(ctx.initial_delay).await {
            return Ok(());
        }

        std::env::set_current_dir(&ctx.work_dir).map_err(|source| KeeperError::WorkDir {
            path: ctx.work_dir.clone(),
            source,
        })?;

        let mut launches: u64 = 0;
        while !self.shutdown.is_closed() {
            match self.launcher.spawn(&ctx.binary_path) {
                Ok(Some(child)) => {
                    launches += 1;
                    debug!(
                        "Launch #{} (PID: {}, started {})",
                        launches,
                        child.pid(),
                        child.started_at().to_rfc3339()
                    );
                    if let Err(e) = self.launcher.supervise(child).await {
                        warn!("Waiting on child failed: {}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => error!("Failed to start {}: {}", ctx.binary_path.display(), e),
            }

            if !self.shutdown.sleep(ctx.retry_interval).await {
                break;
            }

            match self.updater.check_and_apply(&self.launcher).await {
                Ok(UpdateOutcome::NoUpdate) => {}
                Ok(UpdateOutcome::Applied) => {
                    info!("Update applied to {}", ctx.binary_path.display())
                }
                Ok(UpdateOutcome::Interrupted) => break,
                Err(e) if e.is_fatal() => {
                    error!(
                        "CRITICAL: update rollback failed, {} has no valid binary: {}",
                        ctx.binary_path.display(),
                        e
                    );
                    return Err(KeeperError::NoValidBinary(e));
                }
                Err(e) => error!("Update failed, previous binary kept: {}", e),
            }
        }

        Ok(())
    }
}
