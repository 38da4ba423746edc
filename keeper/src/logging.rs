//! Development-time tracing for debugging the supervisor.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to
//!   stderr. Not persisted, not part of keeper product output.
//!
//! - **Run logging (`io/run_log`)**: Product artifacts in `.keeper/`.
//!   Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `info` if unset (the supervisor's
/// per-run diagnostics are its primary console output). Output: stderr,
/// compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=keeper=debug cargo run -- run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
