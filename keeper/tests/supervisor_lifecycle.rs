//! Loop-level tests for full supervisor lifecycle scenarios.
//!
//! These drive `supervise` with scripted launchers and a recording
//! source-control double to verify end-to-end behavior: exit-code handling,
//! update ordering, backoff classification, and loop termination.

use std::fs;

use keeper::io::run_log::RunAction;
use keeper::supervise::{StopReason, supervise};
use keeper::test_support::{RecordingSourceControl, ScmOp, ScriptedLauncher, TestDir};

/// A sequence ending in 0 terminates after exactly `len(sequence)` launches,
/// and every relaunch passes the previous exit code as the launch argument.
#[test]
fn clean_exit_stops_after_exact_launch_count() {
    let dir = TestDir::new().expect("testdir");
    let launcher = ScriptedLauncher::new(vec![Some(3), Some(11), Some(0)]);
    let scm = RecordingSourceControl::new(None);

    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |_| {}).expect("supervise");

    assert_eq!(outcome.runs, 3);
    assert_eq!(outcome.stop, StopReason::CleanStop);
    // Fresh start is -1; afterwards each child sees its predecessor's code.
    assert_eq!(launcher.launches(), vec![-1, 3, 11]);
}

/// A child that never exits 0 keeps getting relaunched; the launch cap
/// bounds the test.
#[test]
fn never_clean_child_relaunches_until_run_limit() {
    let dir = TestDir::new().expect("testdir");
    let mut config = dir.config();
    config.restart.max_runs = 4;
    config.restart.max_consecutive_crashes = 0;
    let launcher = ScriptedLauncher::new(vec![Some(5); 4]);
    let scm = RecordingSourceControl::new(None);

    let outcome = supervise(dir.path(), &config, &launcher, &scm, |_| {}).expect("supervise");

    assert_eq!(outcome.runs, 4);
    assert_eq!(
        outcome.stop,
        StopReason::RunLimit {
            runs: 4,
            max_runs: 4
        }
    );
    assert_eq!(launcher.launches(), vec![-1, 5, 5, 5]);
}

/// Exit 10 triggers fetch-then-checkout with the tag from the tag file,
/// before the relaunch; the child is relaunched with argument 10.
#[test]
fn update_fetches_and_checks_out_tag_before_relaunch() {
    let dir = TestDir::new().expect("testdir");
    let tag_path = dir.write_tag("v2.3.1").expect("write tag");
    let launcher = ScriptedLauncher::new(vec![Some(10), Some(0)]);
    let scm = RecordingSourceControl::new(Some("v2.3.0"));

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert_eq!(outcome.stop, StopReason::CleanStop);
    assert_eq!(
        scm.ops(),
        vec![
            ScmOp::Fetch {
                remote: "origin".to_string(),
                branch: "master".to_string(),
            },
            ScmOp::Checkout {
                tag: "v2.3.1".to_string(),
            },
        ]
    );
    assert_eq!(launcher.launches(), vec![-1, 10]);
    assert_eq!(
        records[0].action,
        RunAction::Update {
            tag: Some("v2.3.1".to_string()),
            applied: true,
        }
    );
    // The tag file is the child's to consume on the next launch.
    assert!(tag_path.is_file());
}

/// Dry-run mode performs no source-control mutation but still relaunches.
#[test]
fn dry_run_update_skips_source_control_mutation() {
    let dir = TestDir::new().expect("testdir");
    dir.write_tag("v2.3.1").expect("write tag");
    let mut config = dir.config();
    config.update.dry_run = true;
    let launcher = ScriptedLauncher::new(vec![Some(10), Some(0)]);
    let scm = RecordingSourceControl::new(Some("v2.3.0"));

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &config, &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert!(scm.ops().is_empty());
    assert_eq!(
        records[0].action,
        RunAction::Update {
            tag: Some("v2.3.1".to_string()),
            applied: false,
        }
    );
}

/// Exit 11 relaunches immediately without any source-control operation.
#[test]
fn restart_code_relaunches_without_update() {
    let dir = TestDir::new().expect("testdir");
    let launcher = ScriptedLauncher::new(vec![Some(11), Some(0)]);
    let scm = RecordingSourceControl::new(None);

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert!(scm.ops().is_empty());
    assert_eq!(records[0].action, RunAction::Restart);
    assert_eq!(records[0].delay_ms, 0);
    assert_eq!(launcher.launches(), vec![-1, 11]);
}

/// Any exit code outside {0, 10, 11} is recorded as a crash with the exact
/// numeric code and the child is relaunched regardless.
#[test]
fn unexpected_code_is_recorded_and_relaunched() {
    let dir = TestDir::new().expect("testdir");
    let launcher = ScriptedLauncher::new(vec![Some(5), Some(0)]);
    let scm = RecordingSourceControl::new(None);

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert_eq!(records[0].exit_code, Some(5));
    assert_eq!(records[0].action, RunAction::Relaunch);
    assert_eq!(launcher.launches(), vec![-1, 5]);
}

/// Enough consecutive crashes trip the circuit breaker instead of looping
/// forever.
#[test]
fn crash_loop_trips_circuit_breaker() {
    let dir = TestDir::new().expect("testdir");
    let mut config = dir.config();
    config.restart.max_consecutive_crashes = 3;
    let launcher = ScriptedLauncher::new(vec![Some(7); 3]);
    let scm = RecordingSourceControl::new(None);

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &config, &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 3);
    assert_eq!(
        outcome.stop,
        StopReason::CrashLoop {
            crashes: 3,
            limit: 3
        }
    );
    assert_eq!(records.last().map(|rec| rec.action.clone()), Some(RunAction::GiveUp));
}

/// A failed checkout writes the failure sentinel into the tag file and the
/// child is still relaunched.
#[test]
fn failed_update_writes_sentinel_and_relaunches() {
    let dir = TestDir::new().expect("testdir");
    let tag_path = dir.write_tag("v9.9.9").expect("write tag");
    let launcher = ScriptedLauncher::new(vec![Some(10), Some(0)]);
    let scm = RecordingSourceControl::new(None).failing_checkout();

    let mut records = Vec::new();
    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |rec| {
        records.push(rec.clone());
    })
    .expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert_eq!(
        records[0].action,
        RunAction::Update {
            tag: None,
            applied: false,
        }
    );
    assert_eq!(fs::read_to_string(&tag_path).expect("read tag"), "FAILURE\n");
}

/// A missing tag file on exit 10 skips the update entirely; no sentinel is
/// invented and the relaunch still happens.
#[test]
fn missing_tag_file_skips_update_and_relaunches() {
    let dir = TestDir::new().expect("testdir");
    let launcher = ScriptedLauncher::new(vec![Some(10), Some(0)]);
    let scm = RecordingSourceControl::new(None);

    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |_| {}).expect("supervise");

    assert_eq!(outcome.runs, 2);
    assert!(scm.ops().is_empty());
    assert!(!dir.path().join(".update").exists());
}

/// Every child run lands as one JSON line in `.keeper/runs.jsonl`.
#[test]
fn run_log_gets_one_line_per_child_run() {
    let dir = TestDir::new().expect("testdir");
    let launcher = ScriptedLauncher::new(vec![Some(11), Some(5), Some(0)]);
    let scm = RecordingSourceControl::new(None);

    let outcome = supervise(dir.path(), &dir.config(), &launcher, &scm, |_| {}).expect("supervise");
    assert_eq!(outcome.runs, 3);

    let contents =
        fs::read_to_string(dir.path().join(".keeper/runs.jsonl")).expect("read run log");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    let first: serde_json::Value = serde_json::from_str(lines[0]).expect("parse first line");
    assert_eq!(first["run"], 1);
    assert_eq!(first["prev_exit"], -1);
    assert_eq!(first["exit_code"], 11);
    let last: serde_json::Value = serde_json::from_str(lines[2]).expect("parse last line");
    assert_eq!(last["action"]["kind"], "stop");
}
