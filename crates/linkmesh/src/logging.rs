//! Structured logging init, the way every teacher binary wires up
//! `tracing-subscriber` at the top of `main` rather than leaving each crate
//! to configure its own global subscriber.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, defaulting to `info` when unset. Safe to call once per
/// process; a second call is a no-op (the underlying `try_init` just
/// returns an error this function swallows).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
