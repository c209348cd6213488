//! queuectl CLI entry point.
//!
//! A thin composition layer: parse arguments, initialize logging, dispatch
//! to the command router, and report a fatal error if one escapes.

use clap::Parser;

use queuectl::app::{handle_fatal_error, init_logging, AppConfig};
use queuectl::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose);
    init_logging(&app_config);

    if let Err(e) = execute_command(cli.command, &app_config).await {
        handle_fatal_error(e);
    }
}
