//! Run-history artifacts in `.keeper/runs.jsonl`.
//!
//! One JSON line per child run, written regardless of `RUST_LOG`. This is
//! product output for operators (what ran, how it exited, what the
//! supervisor did next), not a tracing sink.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// What the supervisor did after a child run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunAction {
    /// Clean stop; the loop ends.
    Stop,
    /// Update step ran. `tag` is `None` when the tag file was unusable;
    /// `applied` is false for dry runs and failed updates.
    Update { tag: Option<String>, applied: bool },
    /// Plain relaunch on the child's request.
    Restart,
    /// Relaunch after an unexpected exit, with backoff.
    Relaunch,
    /// Crash circuit breaker tripped; the loop ends.
    GiveUp,
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    /// 1-indexed launch counter.
    pub run: u32,
    /// Previous-exit argument the child was launched with.
    pub prev_exit: i32,
    /// How the child exited (`None` = killed by a signal).
    pub exit_code: Option<i32>,
    pub action: RunAction,
    /// Backoff applied before the next relaunch, in milliseconds.
    pub delay_ms: u64,
    /// Wall-clock child runtime in milliseconds.
    pub duration_ms: u64,
}

/// Append one record to the run log, creating the directory if needed.
pub fn append_record(path: &Path, record: &RunRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create run log dir {}", parent.display()))?;
    }
    let mut line = serde_json::to_string(record).context("serialize run record")?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open run log {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("append run log {}", path.display()))?;
    Ok(())
}
