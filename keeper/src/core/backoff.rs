//! Restart policy for crash relaunches.
//!
//! Deliberate restart/update exits relaunch immediately; unexpected exits
//! back off exponentially (with jitter, so several supervised instances do
//! not stampede a shared resource in lockstep) and trip a circuit breaker
//! after a configurable number of consecutive crashes.

use std::time::Duration;

use rand::Rng;

/// Policy for relaunching after unexpected child exits.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    /// Delay before the first crash relaunch, in milliseconds. 0 disables
    /// backoff entirely.
    pub base_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter fraction in `[0, 1]`: the delay is scaled uniformly within
    /// `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
    /// Stop supervising after this many consecutive crashes. 0 means never
    /// stop.
    pub max_consecutive_crashes: u32,
}

impl RestartPolicy {
    /// Deterministic delay for the nth consecutive crash (1-indexed),
    /// before jitter: `base * 2^(n-1)`, capped at `max_delay_ms`.
    pub fn base_delay(&self, consecutive_crashes: u32) -> Duration {
        if consecutive_crashes == 0 || self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        // Cap the shift; beyond this the cap below dominates anyway.
        let exp = consecutive_crashes.saturating_sub(1).min(20);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Delay with jitter applied.
    pub fn delay<R: Rng>(&self, consecutive_crashes: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(consecutive_crashes);
        if base.is_zero() || self.jitter <= 0.0 {
            return base;
        }
        let factor = rng.gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        base.mul_f64(factor.max(0.0))
    }

    /// True once the crash circuit breaker should trip.
    pub fn is_exhausted(&self, consecutive_crashes: u32) -> bool {
        self.max_consecutive_crashes > 0 && consecutive_crashes >= self.max_consecutive_crashes
    }
}
