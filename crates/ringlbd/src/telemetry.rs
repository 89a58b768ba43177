//! Tracing setup for the ringlb driver.
//!
//! Logs go to stderr through a `tracing-subscriber` `fmt` layer, filtered by
//! `RUST_LOG` when set and by the configured level otherwise. Stdout is left
//! to script output.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Call this once at startup, before any `tracing` events are emitted.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
