//! Diagnostic logging to stderr, filtered by `CASABOT_LOG`.
//!
//! The transcript on stdout is the user-facing log; this is for debugging.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "CASABOT_LOG";
const DEFAULT_FILTER: &str = "warn";

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
