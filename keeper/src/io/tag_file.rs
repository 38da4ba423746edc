//! The tag file hands the update target from the child to the supervisor.
//!
//! The child writes the target version tag as a single line before exiting
//! with the update code. The supervisor reads it but never deletes it: the
//! child consumes the file on its next launch to confirm the update
//! round-trip, and a failed update is signalled back by overwriting the
//! file with [`FAILURE_SENTINEL`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::warn;

/// Written into the tag file when applying the update failed, so the child
/// can report the failure instead of assuming it runs the new version.
pub const FAILURE_SENTINEL: &str = "FAILURE";

/// Read and validate the tag file: must be a regular file with exactly one
/// non-empty line. Returns the trimmed tag; the file is left in place.
pub fn read_tag(path: &Path) -> Result<String> {
    if path.is_dir() {
        return Err(anyhow!(
            "{} is a directory, expected a file with a version tag",
            path.display()
        ));
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read tag file {}", path.display()))?;
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() > 1 {
        return Err(anyhow!(
            "tag file {} has more than one line",
            path.display()
        ));
    }
    let tag = lines.first().map(|line| line.trim()).unwrap_or("");
    if tag.is_empty() {
        return Err(anyhow!("tag file {} is empty", path.display()));
    }
    Ok(tag.to_string())
}

/// Best-effort write of the failure sentinel; the relaunch proceeds either
/// way, so a write error is only logged.
pub fn write_failure(path: &Path) {
    if let Err(err) = fs::write(path, format!("{FAILURE_SENTINEL}\n")) {
        warn!(path = %path.display(), err = %err, "could not write failure sentinel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_line_tag_and_leaves_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".update");
        fs::write(&path, "v2.3.1\n").expect("write");

        let tag = read_tag(&path).expect("read tag");
        assert_eq!(tag, "v2.3.1");
        assert!(path.is_file(), "tag file must be left for the child");
    }

    #[test]
    fn rejects_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = read_tag(&temp.path().join(".update")).unwrap_err();
        assert!(err.to_string().contains("read tag file"));
    }

    #[test]
    fn rejects_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".update");
        fs::create_dir(&path).expect("mkdir");
        let err = read_tag(&path).unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn rejects_empty_and_blank_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".update");

        fs::write(&path, "").expect("write");
        assert!(read_tag(&path).unwrap_err().to_string().contains("is empty"));

        fs::write(&path, "   \n").expect("write");
        assert!(read_tag(&path).unwrap_err().to_string().contains("is empty"));
    }

    #[test]
    fn rejects_multi_line_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".update");
        fs::write(&path, "v1.0\nv2.0\n").expect("write");
        let err = read_tag(&path).unwrap_err();
        assert!(err.to_string().contains("more than one line"));
    }

    #[test]
    fn failure_sentinel_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".update");
        write_failure(&path);
        assert_eq!(read_tag(&path).expect("read"), FAILURE_SENTINEL);
    }
}
