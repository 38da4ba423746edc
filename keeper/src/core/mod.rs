//! Pure, deterministic supervisor logic. No I/O.

pub mod backoff;
pub mod decision;
pub mod version;
