//! Data model for jobs and configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_max_retries() -> u32 {
    3
}

/// Lifecycle state of a job.
///
/// `Failed` is a transient bookkeeping value produced while `mark_failed`
/// decides between scheduling a retry and moving the job to the DLQ; in
/// steady state every job in the active set is `Pending` or `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        };
        write!(f, "{s}")
    }
}

/// A unit of work: a shell command plus its retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    #[serde(default = "JobState::default_pending")]
    pub state: JobState,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobState {
    fn default_pending() -> Self {
        JobState::Pending
    }
}

impl Job {
    /// Construct a job as a client would submit it via `enqueue <json>`.
    ///
    /// Timestamps and state are overwritten by `Queue::enqueue`; this
    /// constructor only fills in the defaults a bare `{id, command}`
    /// payload needs to deserialize successfully.
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            command: command.into(),
            state: JobState::Pending,
            attempts: 0,
            max_retries: default_max_retries(),
            created_at: now,
            updated_at: now,
            next_retry_at: None,
            error_message: None,
        }
    }

    /// Whether `next_retry_at` is unset or not in the future.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.next_retry_at {
            None => true,
            Some(t) => t <= now,
        }
    }
}

/// Process-wide tunables, persisted alongside the job collections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub max_retries: u32,
    pub backoff_base: f64,
    pub backoff_max_delay: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_max_delay: 3600,
        }
    }
}

/// Snapshot of queue occupancy, as reported by `queuectl status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead: usize,
    pub total: usize,
}
