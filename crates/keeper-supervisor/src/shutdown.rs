//! Shutdown coordination between the supervision loop and its stoppers.
//!
//! [`Shutdown`] is the single place a stop is requested from: the signal
//! listener, the service `on_stop` callback and tests all call
//! [`Shutdown::request_stop`]. It also tracks the PID of the one child the
//! supervisor currently owns.

use keeper_common::ProcessResult;
use keeper_process::ChildHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Inner {
    /// Monotonic, never reset.
    closed: AtomicBool,
    token: CancellationToken,
    /// PID of the live child. Spawning and stopping both hold this lock.
    current_child: Mutex<Option<u32>>,
    stopped: watch::Sender<bool>,
}

/// Cloneable handle to the shared supervisor state.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                token: CancellationToken::new(),
                current_child: Mutex::new(None),
                stopped,
            }),
        }
    }

    /// Mark the supervisor closed and interrupt whatever it is waiting on.
    ///
    /// Returns `true` for the first request only.
    pub fn request_stop(&self) -> bool {
        let first = {
            let current = self.inner.current_child.lock();
            let first = !self.inner.closed.swap(true, Ordering::SeqCst);
            if first {
                info!("Stop requested (tracked child: {:?})", *current);
            }
            first
        };
        self.inner.token.cancel();
        first
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `false` if the sleep was cut short by a stop request.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_closed();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_closed(),
            _ = self.cancelled() => false,
        }
    }

    /// PID of the child currently owned by the supervisor.
    pub fn current_pid(&self) -> Option<u32> {
        *self.inner.current_child.lock()
    }

    /// Run `start` and record the child's PID, unless a stop was already
    /// requested, in which case nothing is started and `None` is returned.
    pub(crate) fn start_tracked<F>(&self, start: F) -> Option<ProcessResult<ChildHandle>>
    where
        F: FnOnce() -> ProcessResult<ChildHandle>,
    {
        let mut current = self.inner.current_child.lock();
        if self.is_closed() {
            return None;
        }

        let result = start();
        if let Ok(ref child) = result {
            if let Some(previous) = current.replace(child.pid()) {
                warn!("Child {} still tracked while starting {}", previous, child.pid());
            }
        }
        Some(result)
    }

    pub(crate) fn untrack(&self, pid: u32) {
        let mut current = self.inner.current_child.lock();
        if *current == Some(pid) {
            *current = None;
        }
    }

    /// SIGKILL the tracked child by PID, bypassing the task that owns it.
    pub(crate) fn kill_tracked(&self) -> ProcessResult<Option<u32>> {
        let current = self.inner.current_child.lock();
        match *current {
            Some(pid) => {
                warn!("Force killing tracked child {}", pid);
                keeper_process::force_kill(pid)?;
                Ok(Some(pid))
            }
            None => Ok(None),
        }
    }

    /// Called by the supervisor when its loop has returned.
    pub(crate) fn mark_stopped(&self) {
        self.inner.stopped.send_replace(true);
        debug!("Supervisor marked stopped");
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.borrow()
    }

    /// Resolves once the supervisor loop has returned.
    pub async fn wait_stopped(&self) {
        let mut rx = self.inner.stopped.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Request a stop and give the supervisor `grace` to kill its child and
    /// return. If it does not, the tracked child is killed by PID.
    ///
    /// Returns `true` when the supervisor stopped within the grace period.
    pub async fn stop_and_wait(&self, grace: Duration) -> bool {
        self.request_stop();

        if tokio::time::timeout(grace, self.wait_stopped()).await.is_ok() {
            return true;
        }

        warn!("Supervisor did not stop within {:?}", grace);
        if let Err(e) = self.kill_tracked() {
            warn!("Failed to kill tracked child: {}", e);
        }
        false
    }
}
