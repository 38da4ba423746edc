//! Supervisor configuration stored under `.keeper/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::backoff::RestartPolicy;

/// Filesystem layout of keeper-owned files under the supervised workdir.
#[derive(Debug, Clone)]
pub struct KeeperPaths {
    pub keeper_dir: PathBuf,
    pub config_path: PathBuf,
    pub run_log_path: PathBuf,
}

impl KeeperPaths {
    pub fn new(workdir: &Path) -> Self {
        let keeper_dir = workdir.join(".keeper");
        Self {
            config_path: keeper_dir.join("config.toml"),
            run_log_path: keeper_dir.join("runs.jsonl"),
            keeper_dir,
        }
    }
}

/// Supervisor configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeeperConfig {
    pub child: ChildConfig,
    pub update: UpdateConfig,
    pub restart: RestartConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChildConfig {
    /// Command line for the bot process (e.g. `["python3", "main.py"]`).
    /// The previous exit code is appended as the final argument.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Tag file the child writes before exiting with the update code,
    /// relative to the workdir.
    pub tag_file: String,
    /// Remote to fetch releases from.
    pub remote: String,
    /// Branch whose tags carry releases.
    pub release_branch: String,
    /// Log intended fetch/checkout without mutating the checkout.
    pub dry_run: bool,
    /// Give up on a hung fetch after this many seconds.
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestartConfig {
    /// Delay before the first crash relaunch, in milliseconds (0 disables
    /// backoff).
    pub base_delay_ms: u64,
    /// Upper bound on the crash backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter fraction in `[0, 1]` applied to crash backoff delays.
    pub jitter: f64,
    /// Stop supervising after this many consecutive crashes (0 = never).
    pub max_consecutive_crashes: u32,
    /// Stop after this many child launches in total (0 = unbounded).
    pub max_runs: u32,
}

impl Default for ChildConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), "main.py".to_string()],
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            tag_file: ".update".to_string(),
            remote: "origin".to_string(),
            release_branch: "master".to_string(),
            dry_run: false,
            fetch_timeout_secs: 300,
        }
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 60_000,
            jitter: 0.2,
            max_consecutive_crashes: 10,
            max_runs: 0,
        }
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            child: ChildConfig::default(),
            update: UpdateConfig::default(),
            restart: RestartConfig::default(),
        }
    }
}

impl UpdateConfig {
    /// Absolute location of the tag file for a given workdir.
    pub fn tag_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.tag_file)
    }
}

impl RestartConfig {
    pub fn policy(&self) -> RestartPolicy {
        RestartPolicy {
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            jitter: self.jitter,
            max_consecutive_crashes: self.max_consecutive_crashes,
        }
    }
}

impl KeeperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.child.command.is_empty() || self.child.command[0].trim().is_empty() {
            return Err(anyhow!("child.command must be a non-empty array"));
        }
        if self.update.tag_file.trim().is_empty() {
            return Err(anyhow!("update.tag_file must not be empty"));
        }
        if self.update.remote.trim().is_empty() {
            return Err(anyhow!("update.remote must not be empty"));
        }
        if self.update.release_branch.trim().is_empty() {
            return Err(anyhow!("update.release_branch must not be empty"));
        }
        if self.update.fetch_timeout_secs == 0 {
            return Err(anyhow!("update.fetch_timeout_secs must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.restart.jitter) {
            return Err(anyhow!("restart.jitter must be within [0, 1]"));
        }
        if self.restart.max_delay_ms < self.restart.base_delay_ms {
            return Err(anyhow!(
                "restart.max_delay_ms must be >= restart.base_delay_ms"
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `KeeperConfig::default()`.
pub fn load_config(path: &Path) -> Result<KeeperConfig> {
    if !path.exists() {
        let cfg = KeeperConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: KeeperConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &KeeperConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
