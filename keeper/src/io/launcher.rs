//! Launching the supervised child process.
//!
//! The [`Launcher`] trait decouples the supervisor loop from actual process
//! spawning. Tests use scripted launchers that return predetermined exit
//! codes without spawning anything.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

/// Parameters for one child launch.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Child command line; the previous exit code is appended as the final
    /// positional argument.
    pub command: Vec<String>,
    /// Working directory for the child.
    pub workdir: PathBuf,
    /// Exit code of the previous run (`FRESH_START_ARG` on the first).
    pub prev_exit: i32,
}

/// How a child run ended. `code` is `None` when the child was killed by a
/// signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
}

/// Abstraction over child process execution.
pub trait Launcher {
    /// Launch the child and block until it exits.
    fn launch(&self, request: &LaunchRequest) -> Result<ExitReport>;
}

/// Launcher that spawns the configured command with inherited stdio.
///
/// The child runs without a timeout: its termination is driven entirely by
/// its own exit, and its output goes straight to the supervisor's console.
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    #[instrument(skip_all, fields(prev_exit = request.prev_exit))]
    fn launch(&self, request: &LaunchRequest) -> Result<ExitReport> {
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| anyhow!("child command is empty"))?;
        info!(program = %program, "launching child");

        let mut child = Command::new(program)
            .args(args)
            .arg(request.prev_exit.to_string())
            .current_dir(&request.workdir)
            .spawn()
            .with_context(|| format!("spawn child {program}"))?;
        debug!(pid = child.id(), "child started");

        let status = child.wait().context("wait for child")?;
        let code = status.code();
        #[cfg(unix)]
        if code.is_none() {
            use std::os::unix::process::ExitStatusExt;
            warn!(signal = ?status.signal(), "child killed by signal");
        }
        debug!(exit_code = ?code, "child exited");
        Ok(ExitReport { code })
    }
}
