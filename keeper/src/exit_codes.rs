//! Stable exit codes: the child contract and the keeper CLI's own codes.
//!
//! The child codes are coordinated with the supervised bot process; they are
//! the only wire-level protocol between the two. Keep them in sync with the
//! bot's shutdown path.

/// Child requested a clean stop; the supervisor loop terminates.
pub const CHILD_SUCCESS: i32 = 0;
/// Child requested a self-update: read the tag file, fetch and check out
/// the named tag, then relaunch.
pub const CHILD_UPDATE: i32 = 10;
/// Child requested a plain relaunch without an update.
pub const CHILD_RESTART: i32 = 11;

/// Previous-exit-code argument passed on the very first launch, so the child
/// can tell a fresh start from a post-update or post-restart relaunch.
pub const FRESH_START_ARG: i32 = -1;

/// Keeper command succeeded (for `run`: the child stopped cleanly).
pub const OK: i32 = 0;
/// Invalid config or other command failure.
pub const INVALID: i32 = 1;
/// `keeper run` stopped because the crash circuit breaker tripped.
pub const CRASH_LOOP: i32 = 3;
