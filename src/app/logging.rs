//! Tracing/logging initialization.

use super::config::AppConfig;

/// Initialize `tracing_subscriber` at the level implied by `config.verbose`.
pub fn init_logging(config: &AppConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level())),
        )
        .with_target(config.verbose >= 2)
        .init();
}
