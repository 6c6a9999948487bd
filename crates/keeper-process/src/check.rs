//! Process existence checking.

use keeper_common::ProcessResult;

/// Check if a process with the given PID exists.
///
/// On Unix this sends signal 0, which delivers nothing but reports whether
/// the PID is valid. A zombie that has not been reaped still counts as
/// existing.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            // Exists, but belongs to someone else.
            Err(Errno::EPERM) => Ok(true),
            Err(e) => Err(keeper_common::ProcessError::configuration(
                pid.to_string(),
                format!("Failed to check process: {}", e),
            )),
        }
    }

    #[cfg(not(unix))]
    {
        Err(keeper_common::ProcessError::configuration(
            pid.to_string(),
            "process existence checks are only supported on Unix",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_exists() {
        assert!(process_exists(std::process::id()).unwrap());
    }

    #[test]
    fn test_init_process_exists() {
        assert!(process_exists(1).unwrap());
    }

    #[test]
    fn test_missing_process() {
        assert!(!process_exists(9_999_999).unwrap());
    }
}
