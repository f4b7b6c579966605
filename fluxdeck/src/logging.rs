//! Diagnostic logging via `tracing`.
//!
//! User-facing progress goes to stdout with `println!`; this is for
//! diagnostics only and writes to stderr.

use tracing_subscriber::{fmt, EnvFilter};

const ENV_LOG: &str = "FLUXDECK_LOG";

/// Install the global subscriber. `FLUXDECK_LOG`, then `RUST_LOG`, take
/// precedence over the level derived from `-v` flags.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

const fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
