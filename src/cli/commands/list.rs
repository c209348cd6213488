//! `queuectl list [--state S] [--limit L]`

use anyhow::Result;

use crate::cli::args::JobStateArg;
use crate::store::Store;

pub async fn run_list_command(store: &Store, state: Option<JobStateArg>, limit: usize) -> Result<()> {
    let jobs = match state {
        Some(s) => store.by_state(s.into()).await?,
        None => store.all().await?,
    };
    let jobs = &jobs[..jobs.len().min(limit)];

    if jobs.is_empty() {
        println!("No jobs found");
        return Ok(());
    }

    println!("\n{:<20} {:<12} {:<10} {:<20}", "ID", "State", "Attempts", "Created");
    println!("{}", "-".repeat(62));
    for job in jobs {
        println!(
            "{:<20} {:<12} {:<10} {:<20}",
            job.id,
            job.state,
            job.attempts,
            job.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!();

    Ok(())
}
