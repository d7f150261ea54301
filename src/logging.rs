//! Logging initialization for the smellcheck CLI.
//!
//! Uses `tracing` with `tracing-subscriber`, writing to stderr so report
//! output on stdout stays machine-readable. `RUST_LOG` overrides the
//! defaults:
//!
//! ```bash
//! RUST_LOG=smellcheck=debug smellcheck check src/
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directives for the given flags.
pub fn default_filter(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "smellcheck=error"
    } else if verbose {
        "smellcheck=info"
    } else {
        "smellcheck=warn"
    }
}

/// Initialize the logging subsystem. Call once, from the binary.
pub fn init_logging(quiet: bool, verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(quiet, verbose)));

    // A subscriber may already be set (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}
