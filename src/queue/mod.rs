//! The job state machine, layered on top of [`crate::store::Store`].
//!
//! Every state transition in the system goes through one of these
//! operations; nothing else is allowed to mutate a `Job`.

use chrono::Utc;
use thiserror::Error;

use crate::store::{Config, Job, JobState, Store, StoreError};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("job {0} already exists")]
    DuplicateJob(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State-machine operations over a `Store`.
///
/// Holds no state of its own beyond a reference to the store it was built
/// from — every operation reads current state, decides the next state, and
/// writes it back.
pub struct Queue<'a> {
    store: &'a Store,
}

impl<'a> Queue<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Add a new job to the active set.
    ///
    /// Rejects an id already present in either the active set or the DLQ:
    /// re-submitting a dead job's id must go through `requeue_from_dlq`
    /// rather than silently resurrecting it under `enqueue`.
    pub async fn enqueue(&self, mut job: Job) -> QueueResult<()> {
        if self.store.get(&job.id).await?.is_some() {
            return Err(QueueError::DuplicateJob(job.id));
        }
        if self.store.dlq_get(&job.id).await?.is_some() {
            return Err(QueueError::DuplicateJob(job.id));
        }

        let now = Utc::now();
        job.state = JobState::Pending;
        job.created_at = now;
        job.updated_at = now;
        job.attempts = 0;
        job.next_retry_at = None;

        self.store.add(job).await?;
        Ok(())
    }

    /// Return the first Pending job (insertion order) eligible to run.
    ///
    /// Has no side effects — claiming execution rights happens separately,
    /// via `Store::acquire_lock`.
    pub async fn pick_next(&self) -> QueueResult<Option<Job>> {
        let now = Utc::now();
        let pending = self.store.by_state(JobState::Pending).await?;
        Ok(pending.into_iter().find(|j| j.is_eligible(now)))
    }

    pub async fn mark_processing(&self, mut job: Job) -> QueueResult<()> {
        job.state = JobState::Processing;
        job.updated_at = Utc::now();
        self.store.update(job).await.map_err(Into::into)
    }

    pub async fn mark_completed(&self, mut job: Job) -> QueueResult<()> {
        job.state = JobState::Completed;
        job.error_message = None;
        job.updated_at = Utc::now();
        self.store.update(job).await.map_err(Into::into)
    }

    /// Record a failed attempt. Moves the job to the DLQ once `attempts`
    /// reaches `max_retries`; otherwise schedules a retry with exponential
    /// backoff.
    pub async fn mark_failed(&self, mut job: Job, err: impl Into<String>) -> QueueResult<()> {
        let config = self.store.get_config().await?;
        job.attempts += 1;
        job.error_message = Some(err.into());
        job.updated_at = Utc::now();

        if job.attempts >= job.max_retries {
            self.store.move_to_dlq(job).await?;
        } else {
            job.next_retry_at = Some(Utc::now() + backoff_delay(&config, job.attempts));
            job.state = JobState::Pending;
            self.store.update(job).await?;
        }
        Ok(())
    }

    /// Move a DLQ entry back into the active set, resetting its retry
    /// bookkeeping. Returns `false` if `id` isn't in the DLQ.
    pub async fn requeue_from_dlq(&self, id: &str) -> QueueResult<bool> {
        let Some(mut job) = self.store.dlq_get(id).await? else {
            return Ok(false);
        };

        job.state = JobState::Pending;
        job.attempts = 0;
        job.next_retry_at = None;
        job.error_message = None;
        job.updated_at = Utc::now();

        self.store.dlq_remove(id).await?;
        self.store.add(job).await?;
        Ok(true)
    }
}

/// `min(backoff_base ^ (attempts - 1), backoff_max_delay)` seconds.
///
/// The first failure (`attempts == 1`) waits `base^0 == 1`s, the second
/// waits `base^1`, and so on.
fn backoff_delay(config: &Config, attempts: u32) -> chrono::Duration {
    let exp = (attempts - 1) as i32;
    let seconds = config.backoff_base.powi(exp).min(config.backoff_max_delay as f64);
    chrono::Duration::milliseconds((seconds * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use proptest::prelude::*;

    async fn open_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn enqueue_rejects_duplicate_active_id() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        queue.enqueue(Job::new("j1", "true")).await.unwrap();

        let err = queue.enqueue(Job::new("j1", "true")).await.unwrap_err();
        assert!(matches!(err, QueueError::DuplicateJob(id) if id == "j1"));
    }

    #[tokio::test]
    async fn enqueue_rejects_id_already_in_dlq() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = Job::new("j1", "false");
        job.max_retries = 1;
        queue.enqueue(job.clone()).await.unwrap();
        let picked = queue.pick_next().await.unwrap().unwrap();
        queue.mark_failed(picked, "boom").await.unwrap();

        let err = queue.enqueue(Job::new("j1", "true")).await.unwrap_err();
        assert!(matches!(err, QueueError::DuplicateJob(_)));
    }

    #[tokio::test]
    async fn pick_next_is_fifo_among_eligible_pending() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        queue.enqueue(Job::new("a", "true")).await.unwrap();
        queue.enqueue(Job::new("b", "true")).await.unwrap();

        let first = queue.pick_next().await.unwrap().unwrap();
        assert_eq!(first.id, "a");
    }

    #[tokio::test]
    async fn pick_next_skips_jobs_not_yet_eligible() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut deferred = Job::new("deferred", "true");
        deferred.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(60));
        store.add(deferred).await.unwrap();
        queue.enqueue(Job::new("ready", "true")).await.unwrap();

        let picked = queue.pick_next().await.unwrap().unwrap();
        assert_eq!(picked.id, "ready");
    }

    #[tokio::test]
    async fn mark_completed_clears_error_and_does_not_bump_attempts() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        queue.enqueue(Job::new("j1", "echo hello")).await.unwrap();
        let job = queue.pick_next().await.unwrap().unwrap();
        queue.mark_processing(job.clone()).await.unwrap();

        queue.mark_completed(job).await.unwrap();

        let done = store.get("j1").await.unwrap().unwrap();
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.attempts, 0);
        assert!(done.error_message.is_none());
    }

    #[tokio::test]
    async fn mark_failed_schedules_retry_before_exhausting_max_retries() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = Job::new("j2", "false");
        job.max_retries = 3;
        queue.enqueue(job).await.unwrap();
        let job = queue.pick_next().await.unwrap().unwrap();

        queue.mark_failed(job, "exit 1").await.unwrap();

        let updated = store.get("j2").await.unwrap().unwrap();
        assert_eq!(updated.state, JobState::Pending);
        assert_eq!(updated.attempts, 1);
        let delay = updated.next_retry_at.unwrap() - Utc::now();
        assert!(delay.num_milliseconds() > 0 && delay.num_milliseconds() <= 1100);
    }

    #[tokio::test]
    async fn mark_failed_exhausting_retries_moves_to_dlq() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = Job::new("j3", "false");
        job.max_retries = 2;
        queue.enqueue(job).await.unwrap();

        for _ in 0..2 {
            let job = queue.pick_next().await.unwrap().unwrap();
            queue.mark_processing(job.clone()).await.unwrap();
            queue.mark_failed(job, "boom").await.unwrap();
        }

        assert!(store.get("j3").await.unwrap().is_none());
        let dead = store.dlq_get("j3").await.unwrap().unwrap();
        assert_eq!(dead.state, JobState::Dead);
        assert_eq!(dead.attempts, 2);
    }

    #[tokio::test]
    async fn backoff_schedule_doubles_and_caps() {
        let config = Config {
            max_retries: 10,
            backoff_base: 2.0,
            backoff_max_delay: 5,
        };
        assert_eq!(backoff_delay(&config, 1).num_seconds(), 1);
        assert_eq!(backoff_delay(&config, 2).num_seconds(), 2);
        assert_eq!(backoff_delay(&config, 3).num_seconds(), 4);
        assert_eq!(backoff_delay(&config, 4).num_seconds(), 5); // capped
    }

    #[tokio::test]
    async fn requeue_from_dlq_resets_attempts_and_moves_back() {
        let (_dir, store) = open_store().await;
        let queue = Queue::new(&store);
        let mut job = Job::new("j4", "false");
        job.max_retries = 1;
        queue.enqueue(job).await.unwrap();
        let job = queue.pick_next().await.unwrap().unwrap();
        queue.mark_failed(job, "boom").await.unwrap();

        let requeued = queue.requeue_from_dlq("j4").await.unwrap();
        assert!(requeued);

        let job = store.get("j4").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.next_retry_at.is_none());
        assert!(job.error_message.is_none());
        assert!(store.dlq_get("j4").await.unwrap().is_none());

        let second_attempt = queue.requeue_from_dlq("j4").await.unwrap();
        assert!(!second_attempt);
    }

    proptest! {
        /// Backoff is monotonically non-decreasing in `attempts` and never
        /// exceeds `backoff_max_delay`, for any valid config and attempt
        /// count (invariant 5 in the design spec's testable properties).
        #[test]
        fn backoff_is_monotonic_and_capped(
            base in 1.01f64..10.0,
            cap in 1u64..10_000,
            attempts in 1u32..50,
        ) {
            let config = Config {
                max_retries: 100,
                backoff_base: base,
                backoff_max_delay: cap,
            };

            let delay = backoff_delay(&config, attempts).num_milliseconds() as f64 / 1000.0;
            prop_assert!(delay <= cap as f64 + 0.001);

            if attempts > 1 {
                let previous = backoff_delay(&config, attempts - 1).num_milliseconds() as f64 / 1000.0;
                prop_assert!(delay >= previous - 0.001);
            }
        }
    }
}
