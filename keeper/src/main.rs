//! Process supervisor CLI for a self-updating bot service.
//!
//! Launches the configured child process in a loop, inspects its exit code,
//! and relaunches, self-updates the checkout, or stops accordingly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use keeper::exit_codes;
use keeper::io::config::{KeeperConfig, KeeperPaths, load_config, write_config};
use keeper::io::git::Git;
use keeper::io::launcher::ProcessLauncher;
use keeper::logging;
use keeper::supervise::{StopReason, supervise};

#[derive(Parser)]
#[command(
    name = "keeper",
    version,
    about = "Process supervisor for a self-updating bot service"
)]
struct Cli {
    /// Working directory containing the bot checkout.
    #[arg(short = 'C', long, default_value = ".")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `.keeper/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Load and validate the config.
    Validate,
    /// Run the supervisor loop until the child stops cleanly.
    Run {
        /// Log update operations without touching the checkout.
        #[arg(long)]
        dry_run: bool,
        /// Stop after this many child launches (0 = unbounded).
        #[arg(long)]
        max_runs: Option<u32>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.workdir, force),
        Command::Validate => cmd_validate(&cli.workdir),
        Command::Run { dry_run, max_runs } => cmd_run(&cli.workdir, dry_run, max_runs),
    }
}

fn cmd_init(workdir: &Path, force: bool) -> Result<i32> {
    let paths = KeeperPaths::new(workdir);
    if paths.config_path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            paths.config_path.display()
        ));
    }
    write_config(&paths.config_path, &KeeperConfig::default())
        .with_context(|| format!("write {}", paths.config_path.display()))?;
    println!("wrote {}", paths.config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(workdir: &Path) -> Result<i32> {
    let paths = KeeperPaths::new(workdir);
    load_config(&paths.config_path)
        .with_context(|| format!("validate {}", paths.config_path.display()))?;
    Ok(exit_codes::OK)
}

fn cmd_run(workdir: &Path, dry_run: bool, max_runs: Option<u32>) -> Result<i32> {
    let paths = KeeperPaths::new(workdir);
    let mut config = load_config(&paths.config_path)?;
    if dry_run {
        config.update.dry_run = true;
    }
    if let Some(max_runs) = max_runs {
        config.restart.max_runs = max_runs;
    }

    let git = Git::new(workdir);
    let outcome = supervise(workdir, &config, &ProcessLauncher, &git, |_| {})?;
    match outcome.stop {
        StopReason::CleanStop => Ok(exit_codes::OK),
        StopReason::RunLimit { .. } => Ok(exit_codes::OK),
        StopReason::CrashLoop { crashes, .. } => {
            eprintln!("giving up after {crashes} consecutive crashes");
            Ok(exit_codes::CRASH_LOOP)
        }
    }
}
