//! PID-level process termination.
//!
//! Used when the task that owns a [`ChildHandle`](crate::ChildHandle) cannot
//! be relied on to kill it, e.g. during process exit.

use keeper_common::ProcessResult;

/// Force kill a process (SIGKILL).
///
/// A PID that no longer exists is treated as already killed.
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(keeper_common::ProcessError::stop_failed(
                pid.to_string(),
                e.to_string(),
            )),
        }
    }

    #[cfg(not(unix))]
    {
        Err(keeper_common::ProcessError::stop_failed(
            pid.to_string(),
            "PID-based termination is only supported on Unix",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_force_kill_missing_pid_is_ok() {
        // Above the default Linux pid_max, so never a live process.
        assert!(force_kill(9_999_999).is_ok());
    }
}
