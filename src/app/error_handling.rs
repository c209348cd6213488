//! Top-level error reporting for the CLI entry point.

use tracing::error;

/// Print `error` to stderr and exit with status 1.
///
/// Every user-visible failure path in this CLI is binary (success or
/// exit 1, per the command-line contract); there is no differentiated
/// exit-code scheme to preserve here.
pub fn handle_fatal_error(error: anyhow::Error) -> ! {
    error!("{error}");
    eprintln!("\u{2717} Error: {error}");
    std::process::exit(1)
}
