//! `queuectl worker start --count N`

use std::path::Path;

use anyhow::Result;

use crate::cli::args::WorkerCommands;

pub async fn run_worker_command(command: WorkerCommands, data_dir: &Path, verbose: u8) -> Result<()> {
    match command {
        WorkerCommands::Start { count } => {
            if count < 1 {
                return Err(anyhow::anyhow!("count must be at least 1"));
            }
            println!("Starting {count} worker(s)...");
            crate::supervisor::run(count, data_dir, verbose).await?;
            println!("Workers stopped");
            Ok(())
        }
    }
}
