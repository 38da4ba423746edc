//! Test-only doubles for the launcher and source-control seams.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

use crate::io::config::{KeeperConfig, RestartConfig};
use crate::io::git::SourceControl;
use crate::io::launcher::{ExitReport, LaunchRequest, Launcher};

/// Launcher that replays a queue of exit codes (`None` = signal death)
/// without spawning processes, recording the prev-exit argument of every
/// launch.
pub struct ScriptedLauncher {
    exits: Mutex<VecDeque<Option<i32>>>,
    launches: Mutex<Vec<i32>>,
}

impl ScriptedLauncher {
    pub fn new(exits: Vec<Option<i32>>) -> Self {
        Self {
            exits: Mutex::new(exits.into()),
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Prev-exit arguments of all launches so far, in order.
    pub fn launches(&self) -> Vec<i32> {
        self.launches.lock().expect("launches lock").clone()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<ExitReport> {
        self.launches
            .lock()
            .expect("launches lock")
            .push(request.prev_exit);
        let code = self
            .exits
            .lock()
            .expect("exits lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted launcher exhausted"))?;
        Ok(ExitReport { code })
    }
}

/// A recorded source-control operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmOp {
    Fetch { remote: String, branch: String },
    Checkout { tag: String },
}

/// Source-control double that records operations instead of running git.
pub struct RecordingSourceControl {
    current: Option<String>,
    ops: Mutex<Vec<ScmOp>>,
    fail_checkout: bool,
}

impl RecordingSourceControl {
    pub fn new(current: Option<&str>) -> Self {
        Self {
            current: current.map(str::to_string),
            ops: Mutex::new(Vec::new()),
            fail_checkout: false,
        }
    }

    /// Make every checkout fail, as a broken ref or dirty worktree would.
    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    /// Recorded operations so far, in order.
    pub fn ops(&self) -> Vec<ScmOp> {
        self.ops.lock().expect("ops lock").clone()
    }
}

impl SourceControl for RecordingSourceControl {
    fn current_tag(&self) -> Result<Option<String>> {
        Ok(self.current.clone())
    }

    fn fetch_release(
        &self,
        remote: &str,
        branch: &str,
        _timeout: std::time::Duration,
    ) -> Result<()> {
        self.ops.lock().expect("ops lock").push(ScmOp::Fetch {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn checkout_tag(&self, tag: &str) -> Result<()> {
        self.ops.lock().expect("ops lock").push(ScmOp::Checkout {
            tag: tag.to_string(),
        });
        if self.fail_checkout {
            return Err(anyhow!("scripted checkout failure"));
        }
        Ok(())
    }
}

/// Temporary supervised workdir with a loop-friendly config.
pub struct TestDir {
    temp: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Config with backoff disabled so loop tests run instantly.
    pub fn config(&self) -> KeeperConfig {
        KeeperConfig {
            restart: RestartConfig {
                base_delay_ms: 0,
                jitter: 0.0,
                ..RestartConfig::default()
            },
            ..KeeperConfig::default()
        }
    }

    /// Write the tag file a child would leave before exiting with the
    /// update code. Returns its path.
    pub fn write_tag(&self, tag: &str) -> Result<PathBuf> {
        let path = self.path().join(".update");
        std::fs::write(&path, format!("{tag}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
