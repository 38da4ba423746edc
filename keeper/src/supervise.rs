//! The supervisor loop for `keeper run`.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{error, info, instrument, warn};

use crate::core::backoff::RestartPolicy;
use crate::core::decision::{ChildSignal, classify_exit};
use crate::exit_codes::FRESH_START_ARG;
use crate::io::config::{KeeperConfig, KeeperPaths};
use crate::io::git::SourceControl;
use crate::io::launcher::{LaunchRequest, Launcher};
use crate::io::run_log::{RunAction, RunRecord, append_record};
use crate::update::run_update;

/// Why the supervisor loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The child exited 0.
    CleanStop,
    /// Too many consecutive crashes; the circuit breaker tripped.
    CrashLoop { crashes: u32, limit: u32 },
    /// The configured launch cap was reached.
    RunLimit { runs: u32, max_runs: u32 },
}

/// Summary of a supervision session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperviseOutcome {
    pub runs: u32,
    pub stop: StopReason,
}

/// Launch the child repeatedly until it stops cleanly, the crash circuit
/// breaker trips, or the launch cap is reached.
///
/// Each launch passes the previous run's exit code as the final argument
/// (`-1` on the first). Deliberate restart/update exits relaunch
/// immediately and reset the crash counter; unexpected exits back off per
/// the restart policy. A failed update is logged and the child is
/// relaunched without one — only launcher failures (e.g. a missing child
/// binary) abort with an error.
#[instrument(skip_all)]
pub fn supervise<L, S, F>(
    workdir: &Path,
    config: &KeeperConfig,
    launcher: &L,
    scm: &S,
    mut on_run: F,
) -> Result<SuperviseOutcome>
where
    L: Launcher,
    S: SourceControl,
    F: FnMut(&RunRecord),
{
    let paths = KeeperPaths::new(workdir);
    let policy = config.restart.policy();
    let mut rng = rand::thread_rng();

    let mut prev_exit = FRESH_START_ARG;
    let mut consecutive_crashes = 0u32;
    let mut runs = 0u32;

    loop {
        if config.restart.max_runs > 0 && runs >= config.restart.max_runs {
            info!(runs, "launch cap reached, stopping");
            return Ok(SuperviseOutcome {
                runs,
                stop: StopReason::RunLimit {
                    runs,
                    max_runs: config.restart.max_runs,
                },
            });
        }

        let started = Instant::now();
        let report = launcher.launch(&LaunchRequest {
            command: config.child.command.clone(),
            workdir: workdir.to_path_buf(),
            prev_exit,
        })?;
        runs += 1;
        let duration = started.elapsed();
        let signal = classify_exit(report.code);

        let mut delay = Duration::ZERO;
        let action = match signal {
            ChildSignal::CleanStop => {
                info!(runs, "child stopped cleanly");
                RunAction::Stop
            }
            ChildSignal::UpdateRequested => {
                consecutive_crashes = 0;
                match run_update(workdir, &config.update, scm) {
                    Ok(outcome) => RunAction::Update {
                        tag: Some(outcome.tag),
                        applied: outcome.applied,
                    },
                    Err(err) => {
                        error!("update failed, relaunching without update: {err:#}");
                        RunAction::Update {
                            tag: None,
                            applied: false,
                        }
                    }
                }
            }
            ChildSignal::RestartRequested => {
                consecutive_crashes = 0;
                info!("child requested a restart");
                RunAction::Restart
            }
            ChildSignal::Crashed { code } => {
                consecutive_crashes += 1;
                error!(consecutive_crashes, "unexpected bot exit code: {code}");
                crash_action(&policy, consecutive_crashes, &mut delay, &mut rng)
            }
            ChildSignal::Terminated => {
                consecutive_crashes += 1;
                error!(consecutive_crashes, "child killed by signal");
                crash_action(&policy, consecutive_crashes, &mut delay, &mut rng)
            }
        };

        let record = RunRecord {
            run: runs,
            prev_exit,
            exit_code: report.code,
            action,
            delay_ms: delay.as_millis() as u64,
            duration_ms: duration.as_millis() as u64,
        };
        // The run log is an operator artifact; failing to write it must not
        // take the supervisor down.
        if let Err(err) = append_record(&paths.run_log_path, &record) {
            warn!("could not append run log: {err:#}");
        }
        on_run(&record);

        match record.action {
            RunAction::Stop => {
                return Ok(SuperviseOutcome {
                    runs,
                    stop: StopReason::CleanStop,
                });
            }
            RunAction::GiveUp => {
                return Ok(SuperviseOutcome {
                    runs,
                    stop: StopReason::CrashLoop {
                        crashes: consecutive_crashes,
                        limit: policy.max_consecutive_crashes,
                    },
                });
            }
            _ => {}
        }

        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis() as u64, "backing off before relaunch");
            thread::sleep(delay);
        }
        prev_exit = signal.exit_arg();
    }
}

fn crash_action<R: Rng>(
    policy: &RestartPolicy,
    crashes: u32,
    delay: &mut Duration,
    rng: &mut R,
) -> RunAction {
    if policy.is_exhausted(crashes) {
        error!(
            crashes,
            limit = policy.max_consecutive_crashes,
            "crash limit reached, giving up"
        );
        RunAction::GiveUp
    } else {
        *delay = policy.delay(crashes, rng);
        RunAction::Relaunch
    }
}
