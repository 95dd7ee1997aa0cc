//! Logging bootstrap for host processes.
//!
//! The engine itself only emits `tracing` events; a host embedding it
//! calls [`init`] once at startup to get formatted output with
//! `RUST_LOG`-style filtering.

use tracing_subscriber::EnvFilter;

/// Default filter directive when the environment sets none.
pub const DEFAULT_DIRECTIVE: &str = "gtt=info";

/// Initialize the process-wide tracing subscriber.
///
/// Environment filters (`RUST_LOG`) take precedence over the default
/// directive. Idempotent: a second call (another subsystem won the
/// race) is a no-op rather than an error.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
