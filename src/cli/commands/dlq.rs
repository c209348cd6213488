//! `queuectl dlq list` / `queuectl dlq retry <id>`

use anyhow::Result;

use crate::cli::args::DlqCommands;
use crate::queue::Queue;
use crate::store::Store;

pub async fn run_dlq_command(store: &Store, command: DlqCommands) -> Result<()> {
    match command {
        DlqCommands::List { limit } => list(store, limit).await,
        DlqCommands::Retry { id } => retry(store, &id).await,
    }
}

async fn list(store: &Store, limit: usize) -> Result<()> {
    let jobs = store.dlq_all().await?;
    let jobs = &jobs[..jobs.len().min(limit)];

    if jobs.is_empty() {
        println!("Dead Letter Queue is empty");
        return Ok(());
    }

    println!("\n{:<20} {:<30} {:<10} {:<30}", "ID", "Command", "Attempts", "Error");
    println!("{}", "-".repeat(90));
    for job in jobs {
        let error = job.error_message.as_deref().unwrap_or("");
        println!(
            "{:<20} {:<30} {:<10} {:<30}",
            job.id,
            truncate(&job.command, 30),
            job.attempts,
            truncate(error, 30)
        );
    }
    println!();

    Ok(())
}

async fn retry(store: &Store, id: &str) -> Result<()> {
    let queue = Queue::new(store);
    if queue.requeue_from_dlq(id).await? {
        println!("\u{2713} Job {id} moved back to queue for retry");
        Ok(())
    } else {
        Err(anyhow::anyhow!("job {id} not found in Dead Letter Queue"))
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
