//! One self-update step between child runs.
//!
//! The child hands over the target tag through the tag file and exits with
//! the update code; the supervisor applies the checkout switch while no
//! child is running, which is the only time the working copy may be
//! mutated.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::version::{is_equal, is_newer, sanitize_version};
use crate::io::config::UpdateConfig;
use crate::io::git::SourceControl;
use crate::io::tag_file::{read_tag, write_failure};

/// Result of a completed update step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub tag: String,
    /// False in dry-run mode: the checkout was not touched.
    pub applied: bool,
}

/// Run one update step: read the tag file, report the version delta, then
/// fetch and check out the tag (or only log the intent in dry-run mode).
///
/// On a fetch/checkout failure the failure sentinel is written back into
/// the tag file so the child can detect the failed update; the error is
/// still returned and the caller relaunches regardless. An unreadable tag
/// file is left in place for inspection.
#[instrument(skip_all)]
pub fn run_update<S: SourceControl>(
    workdir: &Path,
    config: &UpdateConfig,
    scm: &S,
) -> Result<UpdateOutcome> {
    let tag_path = config.tag_path(workdir);
    let tag = read_tag(&tag_path)?;
    report_version_delta(scm, &tag);

    if config.dry_run {
        info!(
            %tag,
            remote = %config.remote,
            branch = %config.release_branch,
            "dry run: would fetch and check out"
        );
        return Ok(UpdateOutcome {
            tag,
            applied: false,
        });
    }

    let timeout = Duration::from_secs(config.fetch_timeout_secs);
    let result = scm
        .fetch_release(&config.remote, &config.release_branch, timeout)
        .and_then(|()| scm.checkout_tag(&tag));
    if let Err(err) = result {
        write_failure(&tag_path);
        return Err(err.context(format!("apply update to {tag}")));
    }
    info!(%tag, "checked out release tag");
    Ok(UpdateOutcome { tag, applied: true })
}

/// Log whether the requested tag is actually ahead of the checkout. The
/// update proceeds either way; the child decided, we only report.
fn report_version_delta<S: SourceControl>(scm: &S, tag: &str) {
    match scm.current_tag() {
        Ok(Some(current)) => {
            let target = sanitize_version(tag);
            let have = sanitize_version(&current);
            if is_equal(&target, &have) {
                warn!(%tag, %current, "target tag is the version already checked out");
            } else if is_newer(&target, &have) {
                info!(%tag, %current, "updating to a newer version");
            } else {
                warn!(%tag, %current, "target tag is not newer than the current version");
            }
        }
        Ok(None) => debug!("no current tag to compare against"),
        Err(err) => warn!(err = %err, "could not determine current tag"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::tag_file::FAILURE_SENTINEL;
    use crate::test_support::{RecordingSourceControl, ScmOp, TestDir};

    #[test]
    fn fetches_then_checks_out_tag() {
        let dir = TestDir::new().expect("testdir");
        dir.write_tag("v2.3.1").expect("write tag");
        let scm = RecordingSourceControl::new(Some("v2.3.0"));

        let outcome =
            run_update(dir.path(), &dir.config().update, &scm).expect("update");

        assert_eq!(outcome.tag, "v2.3.1");
        assert!(outcome.applied);
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
    }

    #[test]
    fn dry_run_reports_without_mutating() {
        let dir = TestDir::new().expect("testdir");
        dir.write_tag("v2.3.1").expect("write tag");
        let scm = RecordingSourceControl::new(Some("v2.3.0"));
        let mut config = dir.config().update;
        config.dry_run = true;

        let outcome = run_update(dir.path(), &config, &scm).expect("update");

        assert_eq!(outcome.tag, "v2.3.1");
        assert!(!outcome.applied);
        assert!(scm.ops().is_empty());
    }

    #[test]
    fn failed_checkout_writes_sentinel() {
        let dir = TestDir::new().expect("testdir");
        let tag_path = dir.write_tag("v9.9.9").expect("write tag");
        let scm = RecordingSourceControl::new(None).failing_checkout();

        let err = run_update(dir.path(), &dir.config().update, &scm).unwrap_err();

        assert!(err.to_string().contains("apply update to v9.9.9"));
        assert_eq!(read_tag(&tag_path).expect("read"), FAILURE_SENTINEL);
    }

    #[test]
    fn invalid_tag_file_is_left_untouched() {
        let dir = TestDir::new().expect("testdir");
        let config = dir.config().update;
        let tag_path = config.tag_path(dir.path());
        std::fs::write(&tag_path, "v1.0\nv2.0\n").expect("write");
        let scm = RecordingSourceControl::new(None);

        let err = run_update(dir.path(), &config, &scm).unwrap_err();

        assert!(err.to_string().contains("more than one line"));
        assert!(scm.ops().is_empty());
        assert_eq!(
            std::fs::read_to_string(&tag_path).expect("read"),
            "v1.0\nv2.0\n"
        );
    }
}
