//! Process supervisor for a self-updating bot service.
//!
//! The supervised child process is opaque: the only contract between it and
//! the supervisor is the exit-code vocabulary, the previous-exit-code launch
//! argument, and the tag file used to hand over an update target. The
//! architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (exit classification, restart
//!   policy, version ordering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, git, process launching,
//!   tag file, run log). Isolated behind trait seams to enable scripted
//!   doubles in tests.
//!
//! Orchestration modules ([`supervise`], [`update`]) coordinate core logic
//! with I/O to implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod supervise;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod update;
