//! `queuectl status`

use anyhow::Result;

use crate::store::Store;

pub async fn run_status_command(store: &Store) -> Result<()> {
    let stats = store.stats().await?;
    let config = store.get_config().await?;

    println!("\n{}", "=".repeat(50));
    println!("QueueCTL Status");
    println!("{}", "=".repeat(50));
    println!("Total Jobs:     {}", stats.total);
    println!("  Pending:      {}", stats.pending);
    println!("  Processing:   {}", stats.processing);
    println!("  Completed:    {}", stats.completed);
    println!("  Failed:       {}", stats.failed);
    println!("  Dead (DLQ):   {}", stats.dead);
    println!("\nConfiguration:");
    println!("  Max Retries:  {}", config.max_retries);
    println!("  Backoff Base: {}", config.backoff_base);
    println!("{}\n", "=".repeat(50));

    Ok(())
}
