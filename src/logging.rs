//! Development-time tracing for debugging tracker traversals.
//!
//! The tracker emits `debug!` events on every open, close, fail, and
//! generator advance. Nothing is persisted; this module only wires those
//! events to stderr for development runs. Hosts embedding the tracker in a
//! real test framework will install their own subscriber instead.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize a tracing subscriber for development logging.
///
/// Reads `RUST_LOG`; defaults to `warn` when unset. Output goes to stderr in
/// the compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=part_tracker=debug cargo test
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
