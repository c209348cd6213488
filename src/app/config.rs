//! Application-wide configuration: logging verbosity and the data
//! directory the store is rooted at.

use std::path::PathBuf;

const DATA_DIR_ENV_VAR: &str = "QUEUECTL_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".queuectl";

/// Ambient settings resolved once at startup and threaded through the CLI
/// layer. Distinct from [`crate::store::Config`], which is the persisted,
/// user-tunable retry/backoff configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging (`-v`, `-vv`, ...).
    pub verbose: u8,
    /// Root directory for `jobs.json`, `dlq.json`, `config.json`, and
    /// `locks/`. Resolved from `QUEUECTL_DATA_DIR`, defaulting to
    /// `.queuectl` in the current directory.
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self { verbose, data_dir }
    }

    /// Log level string driving `tracing_subscriber`'s env filter.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
