//! Process execution primitives.
//!
//! [`ChildHandle`] owns exactly one spawned OS process. It remembers the
//! exit status once observed, which is what makes [`ChildHandle::kill`]
//! safe to call any number of times.

use chrono::{DateTime, Utc};
use keeper_common::{ProcessError, ProcessResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Share the watchdog's stdin/stdout/stderr.
    #[default]
    Inherit,
    /// Connect all three streams to the null device.
    Null,
}

impl StdioMode {
    fn stdio(self) -> Stdio {
        match self {
            StdioMode::Inherit => Stdio::inherit(),
            StdioMode::Null => Stdio::null(),
        }
    }
}

/// Everything needed to start one child process.
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub work_dir: Option<PathBuf>,
    /// Variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub stdio: StdioMode,
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
            env: BTreeMap::new(),
            stdio: StdioMode::default(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn stdio(mut self, mode: StdioMode) -> Self {
        self.stdio = mode;
        self
    }

    /// Same command, different executable.
    pub fn with_program(&self, program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..self.clone()
        }
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(self.stdio.stdio())
            .stdout(self.stdio.stdio())
            .stderr(self.stdio.stdio());

        if let Some(ref wd) = self.work_dir {
            cmd.current_dir(wd);
        }

        cmd
    }
}

/// Handle to one running (or exited) child process.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    pid: u32,
    program: PathBuf,
    started_at: DateTime<Utc>,
    exit_status: Option<ExitStatus>,
}

impl ChildHandle {
    /// Spawn the process described by `command`.
    pub fn start(command: &LaunchCommand) -> ProcessResult<Self> {
        let program = command.program.display().to_string();

        let child = command
            .build()
            .spawn()
            .map_err(|e| ProcessError::spawn_failed(&program, e.to_string()))?;

        // Only `None` once the child has been reaped, which cannot happen before the first wait.
        let pid = child.id().ok_or_else(|| {
            ProcessError::spawn_failed(&program, "process exited before its PID was read")
        })?;

        info!("Process spawned successfully: {} (PID: {})", program, pid);

        Ok(Self {
            child,
            pid,
            program: command.program.clone(),
            started_at: Utc::now(),
            exit_status: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time since the process was spawned.
    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Exit status, if the process has already been observed to exit.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Block until the process exits, whatever its exit code.
    pub async fn wait(&mut self) -> ProcessResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ProcessError::wait_failed(self.pid.to_string(), e.to_string()))?;

        self.exit_status = Some(status);
        Ok(status)
    }

    /// Forcibly terminate the process and reap it.
    ///
    /// Calling this on a process that already exited, or was already killed,
    /// is a no-op.
    pub async fn kill(&mut self) -> ProcessResult<()> {
        if self.exit_status.is_some() {
            debug!("Process {} already exited, nothing to kill", self.pid);
            return Ok(());
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                return Err(ProcessError::stop_failed(self.pid.to_string(), e.to_string()));
            }
        }

        self.child
            .start_kill()
            .map_err(|e| ProcessError::stop_failed(self.pid.to_string(), e.to_string()))?;

        let status = self.wait().await?;
        info!("Process {} killed ({})", self.pid, status);
        Ok(())
    }

    /// Give up the handle and its OS bookkeeping.
    pub fn release(mut self) {
        if self.exit_status.is_none() {
            // Reap if it already exited; otherwise tokio's orphan reaper takes over.
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_status = Some(status);
            }
        }
        debug!(
            "Released process handle {} (exit: {:?})",
            self.pid, self.exit_status
        );
    }
}
