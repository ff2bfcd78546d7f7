//! Tracing setup for binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info`. Safe to call more than once; later calls do nothing.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Like [`init_tracing`] with a custom fallback filter, e.g.
/// `"lingoforge_room=debug,info"`.
pub fn init_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
