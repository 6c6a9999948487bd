//! Starting and waiting on the supervised child.
//!
//! Both the supervision loop and the updater's validation launch go through
//! [`Launcher`], so either kind of child occupies the same tracked slot and
//! is killed the same way when a stop arrives.

use crate::context::SupervisorContext;
use crate::shutdown::Shutdown;
use keeper_common::ProcessResult;
use keeper_process::{ChildHandle, LaunchCommand};
use std::path::Path;
use std::process::ExitStatus;
use tracing::{info, warn};

/// How a supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// The child exited on its own, with any status.
    Exited(ExitStatus),
    /// A stop was requested and the child was killed.
    Killed,
}

#[derive(Debug, Clone)]
pub struct Launcher {
    command: LaunchCommand,
    shutdown: Shutdown,
}

impl Launcher {
    pub fn new(context: &SupervisorContext, shutdown: Shutdown) -> Self {
        Self {
            command: context.launch_command(),
            shutdown,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Start `program` with the configured arguments, directory and environment.
    ///
    /// `Ok(None)` means a stop was already requested and nothing was started.
    pub fn spawn(&self, program: &Path) -> ProcessResult<Option<ChildHandle>> {
        let command = self.command.with_program(program);
        self.shutdown
            .start_tracked(|| ChildHandle::start(&command))
            .transpose()
    }

    /// Wait for `child` to exit, killing it if a stop arrives first, then
    /// release it.
    pub async fn supervise(&self, mut child: ChildHandle) -> ProcessResult<ChildOutcome> {
        let pid = child.pid();

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.shutdown.cancelled() => None,
        };

        let outcome = match exited {
            Some(Ok(status)) => Ok(ChildOutcome::Exited(status)),
            Some(Err(e)) => {
                // The child may still be running; it must be gone before the slot frees.
                if let Err(kill_err) = child.kill().await {
                    warn!("Failed to kill child {} after lost wait: {}", pid, kill_err);
                }
                Err(e)
            }
            None => {
                info!("Stopping child {} on shutdown", pid);
                child.kill().await.map(|_| ChildOutcome::Killed)
            }
        };

        self.shutdown.untrack(pid);

        let program = child.program().display();
        match &outcome {
            Ok(ChildOutcome::Exited(status)) if status.success() => {
                info!(
                    "Child {} ({}) exited ({}) after {:?}",
                    program,
                    pid,
                    status,
                    child.uptime()
                );
            }
            Ok(ChildOutcome::Exited(status)) => {
                warn!(
                    "Child {} ({}) exited abnormally ({}) after {:?}",
                    program,
                    pid,
                    status,
                    child.uptime()
                );
            }
            Ok(ChildOutcome::Killed) => {}
            Err(e) => warn!("Lost track of child {} ({}): {}", program, pid, e),
        }

        child.release();
        outcome
    }
}
