//! Routes a parsed [`Commands`] to its implementation, opening the store
//! once per invocation.

use anyhow::Result;

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::{
    run_config_command, run_dlq_command, run_enqueue_command, run_internal_worker,
    run_list_command, run_status_command, run_worker_command,
};
use crate::store::Store;

pub async fn execute_command(command: Commands, app_config: &AppConfig) -> Result<()> {
    // `worker start` and `internal-worker-run` manage their own Store
    // handles (the supervisor never opens one; each re-exec'd worker
    // opens its own), so they're routed before the shared `Store::open`
    // below.
    match command {
        Commands::Worker { command } => {
            return run_worker_command(command, &app_config.data_dir, app_config.verbose).await;
        }
        Commands::InternalWorkerRun { id } => {
            return run_internal_worker(id, &app_config.data_dir).await;
        }
        _ => {}
    }

    let store = Store::open(app_config.data_dir.as_path()).await?;

    match command {
        Commands::Enqueue { job_json } => run_enqueue_command(&store, &job_json).await,
        Commands::Status => run_status_command(&store).await,
        Commands::List { state, limit } => run_list_command(&store, state, limit).await,
        Commands::Dlq { command } => run_dlq_command(&store, command).await,
        Commands::Config { command } => run_config_command(&store, command).await,
        Commands::Worker { .. } | Commands::InternalWorkerRun { .. } => unreachable!(),
    }
}
