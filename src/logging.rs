//! Logging setup.
//!
//! Logs go to stderr through `tracing`. `RUST_LOG` always wins; without it
//! the level comes from the CLI flags: `--verbose` is debug, `--quiet` is
//! error, and the default is warn.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given flags.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
