//! `queuectl config show` / `queuectl config set <key> <value>`

use anyhow::Result;

use crate::cli::args::ConfigCommands;
use crate::store::Store;

pub async fn run_config_command(store: &Store, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(store).await,
        ConfigCommands::Set { key, value } => set(store, &key, &value).await,
    }
}

async fn show(store: &Store) -> Result<()> {
    let config = store.get_config().await?;
    println!("\nCurrent Configuration:");
    println!("  max-retries:   {}", config.max_retries);
    println!("  backoff-base:  {}", config.backoff_base);
    println!("  backoff-max-delay: {} seconds", config.backoff_max_delay);
    println!();
    Ok(())
}

async fn set(store: &Store, key: &str, value: &str) -> Result<()> {
    let mut config = store.get_config().await?;

    match key {
        "max-retries" => {
            let parsed: u32 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid value for max-retries: {value}"))?;
            if parsed == 0 {
                return Err(anyhow::anyhow!(
                    "invalid value for max-retries: {value} (must be positive)"
                ));
            }
            config.max_retries = parsed;
        }
        "backoff-base" => {
            let parsed: f64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid value for backoff-base: {value}"))?;
            if !(parsed > 1.0) {
                return Err(anyhow::anyhow!(
                    "invalid value for backoff-base: {value} (must be greater than 1.0)"
                ));
            }
            config.backoff_base = parsed;
        }
        "backoff-max-delay" => {
            config.backoff_max_delay = value
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid value for backoff-max-delay: {value}"))?;
        }
        other => return Err(anyhow::anyhow!("unknown config key: {other}")),
    }

    store.set_config(config).await?;
    println!("\u{2713} Configuration updated: {key} = {value}");
    Ok(())
}
