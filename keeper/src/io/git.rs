//! Git adapter for the update step.
//!
//! The supervisor mutates the working checkout only between child runs, so
//! we keep a small, explicit wrapper around `git` subprocess calls and hide
//! it behind [`SourceControl`] so tests can record operations instead.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::run_command_with_timeout;

const FETCH_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// The source-control operations the update step needs.
pub trait SourceControl {
    /// The tag the checkout currently sits on, if any.
    fn current_tag(&self) -> Result<Option<String>>;
    /// Fetch the release branch and its tags from the remote.
    fn fetch_release(&self, remote: &str, branch: &str, timeout: Duration) -> Result<()>;
    /// Check out the named tag in place.
    fn checkout_tag(&self, tag: &str) -> Result<()>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl SourceControl for Git {
    #[instrument(skip_all)]
    fn current_tag(&self) -> Result<Option<String>> {
        // No tag reachable from HEAD is a normal state for a fresh clone.
        let out = self.run(&["describe", "--tags", "--abbrev=0"])?;
        if !out.status.success() {
            debug!("no tag reachable from HEAD");
            return Ok(None);
        }
        Ok(parse_tag_output(&String::from_utf8_lossy(&out.stdout)))
    }

    #[instrument(skip_all, fields(remote, branch))]
    fn fetch_release(&self, remote: &str, branch: &str, timeout: Duration) -> Result<()> {
        debug!(remote, branch, "fetching release branch and tags");
        let mut cmd = Command::new("git");
        cmd.args(["fetch", "--tags", remote, branch])
            .current_dir(&self.workdir);
        let out = run_command_with_timeout(cmd, timeout, FETCH_OUTPUT_LIMIT_BYTES)
            .context("run git fetch")?;
        if out.timed_out {
            warn!(timeout_secs = timeout.as_secs(), "git fetch timed out");
            return Err(anyhow!("git fetch timed out after {timeout:?}"));
        }
        if !out.status.success() {
            return Err(anyhow!("git fetch failed: {}", out.stderr_lossy()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(tag))]
    fn checkout_tag(&self, tag: &str) -> Result<()> {
        debug!(tag, "checking out tag");
        self.run_checked(&["checkout", tag])?;
        Ok(())
    }
}

fn parse_tag_output(out: &str) -> Option<String> {
    let tag = out.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}
