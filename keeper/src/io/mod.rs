//! Side-effecting operations: config, git, process launching, tag file,
//! run log. Kept behind trait seams where tests need scripted doubles.

pub mod config;
pub mod git;
pub mod launcher;
pub mod process;
pub mod run_log;
pub mod tag_file;
