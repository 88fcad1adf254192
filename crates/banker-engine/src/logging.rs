//! Tracing subscriber setup.
//!
//! The library crates only emit `tracing` events. Binaries and test harnesses
//! that want to see them call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"warn"` or `"banker_core=debug"`).
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
