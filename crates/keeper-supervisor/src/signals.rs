//! OS signal listener.
//!
//! Hangup is swallowed (reserved for a future configuration reload).
//! Interrupt and terminate end the watchdog: see [`SignalListener::run`].

use crate::shutdown::Shutdown;
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the supervisor gets to kill its child before the listener
/// kills it by PID and exits anyway.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct SignalListener {
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalListener {
    /// Register the signal handlers. Must be called inside a tokio runtime.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                hangup: signal(SignalKind::hangup())?,
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for a terminating signal and return its name.
    pub async fn wait_for_termination(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            loop {
                tokio::select! {
                    _ = self.hangup.recv() => {
                        debug!("Received SIGHUP, ignoring");
                    }
                    _ = self.interrupt.recv() => return "SIGINT",
                    _ = self.terminate.recv() => return "SIGTERM",
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl+C handler failed: {}", e);
                std::future::pending::<()>().await;
            }
            "Ctrl+C"
        }
    }

    /// Listen for the life of the service. On a terminating signal, stop the
    /// supervisor (which kills its child), then exit the process.
    pub async fn run(mut self, shutdown: Shutdown) {
        let signal = self.wait_for_termination().await;
        info!("Received {} signal, shutting down", signal);

        if !shutdown.stop_and_wait(SHUTDOWN_GRACE).await {
            warn!("Exiting without a clean supervisor stop");
        }

        std::process::exit(0);
    }
}
