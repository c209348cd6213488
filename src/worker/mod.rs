//! The poll loop that turns pending jobs into completed, retried, or dead
//! ones.
//!
//! One `Worker` owns one OS process's worth of execution: it repeatedly asks
//! the `Queue` for the next eligible job, tries to claim execution rights via
//! the store's per-job lock, and runs the job through the configured
//! `CommandRunner`. Coordination across workers (including workers in other
//! processes) is entirely filesystem-based; a `Worker` holds no state that
//! another worker needs to know about.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::queue::Queue;
use crate::store::Store;
use crate::subprocess::{CommandOutcome, CommandRunner};

/// Wall-clock budget for a single job attempt.
const JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// How long to sleep after finding no eligible work before polling again.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Worker<R: CommandRunner> {
    id: u32,
    store: Store,
    runner: R,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl<R: CommandRunner> Worker<R> {
    pub fn new(id: u32, store: Store, runner: R, running: Arc<AtomicBool>) -> Self {
        Self {
            id,
            store,
            runner,
            poll_interval: DEFAULT_POLL_INTERVAL,
            running,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until `running` is cleared. Always finishes whatever job it is
    /// currently executing before checking `running` again — a worker never
    /// abandons a job mid-attempt, it just doesn't pick up a new one.
    pub async fn run(&self) {
        tracing::info!(worker = self.id, "worker started");
        while self.running.load(Ordering::SeqCst) {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "worker poll failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        tracing::info!(worker = self.id, "worker stopped");
    }

    /// One iteration: pick, claim, execute. Returns `Ok(true)` if a job was
    /// picked (whether or not the lock was won), so the caller knows not to
    /// sleep — a lost lock race should be retried immediately, not after a
    /// full poll interval.
    async fn poll_once(&self) -> crate::queue::QueueResult<bool> {
        let queue = Queue::new(&self.store);
        let Some(job) = queue.pick_next().await? else {
            return Ok(false);
        };

        let Some(_lock) = self.store.acquire_lock(&job.id).await? else {
            tracing::debug!(worker = self.id, job = %job.id, "lost lock race, retrying");
            return Ok(true);
        };

        tracing::info!(worker = self.id, job = %job.id, command = %job.command, "picked up job");
        queue.mark_processing(job.clone()).await?;

        match self.runner.run(&job.command, JOB_TIMEOUT).await {
            Ok(CommandOutcome::Success) => {
                tracing::info!(worker = self.id, job = %job.id, "job completed");
                queue.mark_completed(job).await?;
            }
            Ok(CommandOutcome::NonZero { code, stderr }) => {
                let message = if stderr.trim().is_empty() {
                    format!("Exit code: {code}")
                } else {
                    stderr
                };
                tracing::warn!(worker = self.id, job = %job.id, code, "job failed");
                queue.mark_failed(job, message).await?;
            }
            Ok(CommandOutcome::Timeout) => {
                tracing::warn!(worker = self.id, job = %job.id, "job timed out");
                queue.mark_failed(job, "Command timeout (5 minutes)").await?;
            }
            Err(e) => {
                tracing::error!(worker = self.id, job = %job.id, error = %e, "job runner error");
                queue.mark_failed(job, e.to_string()).await?;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JobState;
    use crate::subprocess::MockRunner;

    async fn open_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    fn flag(value: bool) -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(value))
    }

    #[tokio::test]
    async fn poll_once_with_no_work_returns_false() {
        let (_dir, store) = open_store().await;
        let worker = Worker::new(1, store, MockRunner::new(vec![]), flag(true));
        assert!(!worker.poll_once().await.unwrap());
    }

    #[tokio::test]
    async fn successful_job_is_marked_completed() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        queue
            .enqueue(crate::store::Job::new("j1", "echo hi"))
            .await
            .unwrap();

        let runner = MockRunner::new(vec![Ok(CommandOutcome::Success)]);
        let worker = Worker::new(1, store, runner, flag(true));
        assert!(worker.poll_once().await.unwrap());

        let job = worker.store.get("j1").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
    }

    #[tokio::test]
    async fn nonzero_exit_schedules_retry_with_stderr_message() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = crate::store::Job::new("j1", "false");
        job.max_retries = 3;
        queue.enqueue(job).await.unwrap();

        let runner = MockRunner::new(vec![Ok(CommandOutcome::NonZero {
            code: 1,
            stderr: "boom".to_string(),
        })]);
        let worker = Worker::new(1, store, runner, flag(true));
        worker.poll_once().await.unwrap();

        let job = worker.store.get("j1").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn nonzero_exit_with_empty_stderr_falls_back_to_exit_code_message() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = crate::store::Job::new("j1", "false");
        job.max_retries = 3;
        queue.enqueue(job).await.unwrap();

        let runner = MockRunner::new(vec![Ok(CommandOutcome::NonZero {
            code: 7,
            stderr: String::new(),
        })]);
        let worker = Worker::new(1, store, runner, flag(true));
        worker.poll_once().await.unwrap();

        let job = worker.store.get("j1").await.unwrap().unwrap();
        assert_eq!(job.error_message.as_deref(), Some("Exit code: 7"));
    }

    #[tokio::test]
    async fn timeout_records_fixed_message() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = crate::store::Job::new("j1", "sleep 1000");
        job.max_retries = 3;
        queue.enqueue(job).await.unwrap();

        let runner = MockRunner::new(vec![Ok(CommandOutcome::Timeout)]);
        let worker = Worker::new(1, store, runner, flag(true));
        worker.poll_once().await.unwrap();

        let job = worker.store.get("j1").await.unwrap().unwrap();
        assert_eq!(job.error_message.as_deref(), Some("Command timeout (5 minutes)"));
    }

    #[tokio::test]
    async fn runner_error_marks_job_failed_with_error_text() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = crate::store::Job::new("j1", "nonexistent-binary");
        job.max_retries = 3;
        queue.enqueue(job).await.unwrap();

        let runner = MockRunner::new(vec![Err(crate::subprocess::ProcessError::CommandNotFound(
            "sh".to_string(),
        ))]);
        let worker = Worker::new(1, store, runner, flag(true));
        worker.poll_once().await.unwrap();

        let job = worker.store.get("j1").await.unwrap().unwrap();
        assert!(job.error_message.is_some());
    }

    #[tokio::test]
    async fn exhausting_retries_moves_job_to_dlq() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = crate::store::Job::new("j1", "false");
        job.max_retries = 1;
        queue.enqueue(job).await.unwrap();

        let runner = MockRunner::new(vec![Ok(CommandOutcome::NonZero {
            code: 1,
            stderr: "boom".to_string(),
        })]);
        let worker = Worker::new(1, store, runner, flag(true));
        worker.poll_once().await.unwrap();

        assert!(worker.store.get("j1").await.unwrap().is_none());
        assert!(worker.store.dlq_get("j1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn run_stops_once_flag_is_cleared_with_no_work() {
        let (_dir, store) = open_store().await;
        let running = flag(true);
        let worker = Worker::new(1, store, MockRunner::new(vec![]), running.clone())
            .with_poll_interval(Duration::from_millis(10));

        running.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(1), worker.run())
            .await
            .expect("worker should stop promptly once running is cleared");
    }
}
