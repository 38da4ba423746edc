//! Classification of child exit statuses into supervisor actions.

use crate::exit_codes::{CHILD_RESTART, CHILD_SUCCESS, CHILD_UPDATE};

/// What the child's exit communicated to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSignal {
    /// Regular shutdown; the supervisor loop ends.
    CleanStop,
    /// The child wrote the tag file and wants the supervisor to update
    /// the checkout before relaunching.
    UpdateRequested,
    /// Plain relaunch without an update.
    RestartRequested,
    /// Any other exit code: unexpected failure, relaunch with backoff.
    Crashed { code: i32 },
    /// The child died without an exit code (killed by a signal).
    Terminated,
}

impl ChildSignal {
    /// True for exits that count against the crash circuit breaker.
    pub fn is_crash(self) -> bool {
        matches!(self, ChildSignal::Crashed { .. } | ChildSignal::Terminated)
    }

    /// The exit code to pass to the next launch as the previous-exit argument.
    ///
    /// Signal deaths have no code; the child sees them as a generic crash.
    pub fn exit_arg(self) -> i32 {
        match self {
            ChildSignal::CleanStop => CHILD_SUCCESS,
            ChildSignal::UpdateRequested => CHILD_UPDATE,
            ChildSignal::RestartRequested => CHILD_RESTART,
            ChildSignal::Crashed { code } => code,
            ChildSignal::Terminated => 1,
        }
    }
}

/// Map a raw exit code (`None` = signal death) to a [`ChildSignal`].
pub fn classify_exit(code: Option<i32>) -> ChildSignal {
    match code {
        Some(CHILD_SUCCESS) => ChildSignal::CleanStop,
        Some(CHILD_UPDATE) => ChildSignal::UpdateRequested,
        Some(CHILD_RESTART) => ChildSignal::RestartRequested,
        Some(code) => ChildSignal::Crashed { code },
        None => ChildSignal::Terminated,
    }
}
