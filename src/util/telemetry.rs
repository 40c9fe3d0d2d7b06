//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid: scheduler lifecycle at
/// `info`, everything else at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "warn,retry_lot=info";

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVES`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a fmt subscriber filtered by [`env_filter`] unless one is already
/// set. Closing a `run` span logs its duration, so each run's wall time shows
/// up next to its `run_id`.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
