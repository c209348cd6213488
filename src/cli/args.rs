//! Command-line argument structures.

use clap::{Parser, Subcommand, ValueEnum};

use crate::store::JobState;

/// queuectl - persistent background job queue with concurrent workers
#[derive(Parser)]
#[command(name = "queuectl")]
#[command(about = "Persistent background job queue with concurrent workers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue a new job from a JSON payload
    Enqueue {
        /// Job JSON, e.g. '{"id":"job1","command":"echo hello"}'
        job_json: String,
    },

    /// Manage worker processes
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Show job queue status and statistics
    Status,

    /// List active jobs
    List {
        /// Filter by state
        #[arg(long)]
        state: Option<JobStateArg>,

        /// Maximum jobs to display
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage the Dead Letter Queue
    Dlq {
        #[command(subcommand)]
        command: DlqCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run a single worker in the foreground. Used internally by
    /// `worker start` to re-exec this binary as N independent processes;
    /// not part of the documented user-facing surface.
    #[command(name = "internal-worker-run", hide = true)]
    InternalWorkerRun {
        #[arg(long)]
        id: u32,
    },
}

#[derive(Subcommand)]
pub enum WorkerCommands {
    /// Start one or more workers
    Start {
        /// Number of workers to start
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
}

#[derive(Subcommand)]
pub enum DlqCommands {
    /// List jobs in the Dead Letter Queue
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Retry a job from the Dead Letter Queue
    Retry {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    ///
    /// Keys: max-retries (int), backoff-base (float), backoff-max-delay (int)
    Set {
        key: String,
        value: String,
    },
}

/// CLI-facing mirror of the active job states, excluding `Dead` (DLQ
/// entries are listed separately via `dlq list`).
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum JobStateArg {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<JobStateArg> for JobState {
    fn from(value: JobStateArg) -> Self {
        match value {
            JobStateArg::Pending => JobState::Pending,
            JobStateArg::Processing => JobState::Processing,
            JobStateArg::Completed => JobState::Completed,
            JobStateArg::Failed => JobState::Failed,
        }
    }
}
