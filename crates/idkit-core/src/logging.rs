//! Tracing setup for hosts without a subscriber of their own.

use tracing_subscriber::EnvFilter;

/// Install a compact stderr subscriber honoring `RUST_LOG`.
///
/// Embedding hosts that already install a subscriber should skip this; the
/// crate only emits through the `tracing` facade and works with whatever is
/// installed. Calling it twice is harmless, the second install is ignored.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}
