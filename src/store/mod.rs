//! Durable, concurrency-safe storage for jobs, the dead letter queue, and
//! configuration.
//!
//! Every mutation rewrites the whole target file: new contents land in a
//! sibling `.tmp` file, get fsync'd, then are renamed over the target. That
//! gives crash-atomicity for a single file without a write-ahead log, which
//! is appropriate for the hundreds-of-jobs scale this store is built for.
//! Cross-process coordination on top of that (which worker may execute a
//! given job, and keeping two workers' concurrent rewrites of *different*
//! jobs from tearing each other) is handled by [`lock`].

pub mod error;
pub mod lock;
pub mod types;

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

pub use error::{StoreError, StoreResult};
pub use types::{Config, Job, JobState, Stats};

/// A held per-job execution lock. Dropping it releases the lock.
pub struct JobLock(lock::LockGuard);

/// Durable handle to one data directory.
///
/// Intended to be opened once per process and then shared (by reference) by
/// every `Queue` and `Worker` in that process; all cross-process safety
/// comes from the filesystem, not from anything in-memory here.
pub struct Store {
    data_dir: PathBuf,
    locks_dir: PathBuf,
}

impl Store {
    /// Open (creating if necessary) the store rooted at `data_dir`.
    ///
    /// Missing `jobs.json`/`dlq.json`/`config.json` are created with
    /// empty-array / default-config contents. Runs the startup
    /// reconciliation pass: any job id present in both the active set and
    /// the DLQ is dropped from the active set (see module docs on
    /// `move_to_dlq`).
    pub async fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        let locks_dir = data_dir.join("locks");
        tokio::fs::create_dir_all(&locks_dir).await?;

        let store = Self {
            data_dir,
            locks_dir,
        };

        if !store.jobs_path().exists() {
            store.write_jobs(&[]).await?;
        }
        if !store.dlq_path().exists() {
            store.write_dlq(&[]).await?;
        }
        if !store.config_path().exists() {
            store.write_config(&Config::default()).await?;
        }

        store.reconcile_duplicates().await?;

        Ok(store)
    }

    fn jobs_path(&self) -> PathBuf {
        self.data_dir.join("jobs.json")
    }

    fn dlq_path(&self) -> PathBuf {
        self.data_dir.join("dlq.json")
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// For any id present in both `active` and `dlq`, drop the active-side
    /// copy. Guards against the crash window in `move_to_dlq`, which
    /// appends to the DLQ before removing from active (see §7 of the
    /// design spec): a crash between those two writes leaves a detectable
    /// duplicate that is safe to resolve by favoring the DLQ.
    async fn reconcile_duplicates(&self) -> StoreResult<()> {
        let jobs = self.read_jobs().await?;
        let dlq = self.read_dlq().await?;
        let dead_ids: std::collections::HashSet<&str> =
            dlq.iter().map(|j| j.id.as_str()).collect();

        if jobs.iter().any(|j| dead_ids.contains(j.id.as_str())) {
            let kept: Vec<Job> = jobs
                .into_iter()
                .filter(|j| !dead_ids.contains(j.id.as_str()))
                .collect();
            self.write_jobs(&kept).await?;
        }

        Ok(())
    }

    async fn read_jobs(&self) -> StoreResult<Vec<Job>> {
        read_json_array(&self.jobs_path()).await
    }

    async fn write_jobs(&self, jobs: &[Job]) -> StoreResult<()> {
        atomic_write_json(&self.jobs_path(), jobs).await
    }

    async fn read_dlq(&self) -> StoreResult<Vec<Job>> {
        read_json_array(&self.dlq_path()).await
    }

    async fn write_dlq(&self, jobs: &[Job]) -> StoreResult<()> {
        atomic_write_json(&self.dlq_path(), jobs).await
    }

    async fn read_config(&self) -> StoreResult<Config> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::serialization(path.display().to_string(), e))
    }

    async fn write_config(&self, config: &Config) -> StoreResult<()> {
        atomic_write_json(&self.config_path(), config).await
    }

    /// Run `f` while holding the short, whole-store lock (`locks/.store.lock`).
    ///
    /// Serializes the read-modify-rewrite windows of concurrent mutators so
    /// that two workers touching different jobs can't have one's rename
    /// silently discard the other's concurrent rewrite.
    async fn with_store_lock<F, Fut, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        let locks_dir = self.locks_dir.clone();
        let guard =
            tokio::task::spawn_blocking(move || lock::acquire_store_lock(&locks_dir))
                .await
                .expect("store lock task panicked")?;
        let result = f().await;
        guard.release();
        result
    }

    /// Look up a job by id in the active set.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Job>> {
        Ok(self.read_jobs().await?.into_iter().find(|j| j.id == id))
    }

    /// Add a new job to the active set.
    ///
    /// Callers (the `Queue`) are responsible for checking for duplicate
    /// ids before calling this; the store itself just appends.
    pub async fn add(&self, job: Job) -> StoreResult<()> {
        self.with_store_lock(|| async {
            let mut jobs = self.read_jobs().await?;
            jobs.push(job);
            self.write_jobs(&jobs).await
        })
        .await
    }

    /// Replace an existing active job. Fails with `NotFound` if `job.id`
    /// isn't present.
    pub async fn update(&self, job: Job) -> StoreResult<()> {
        self.with_store_lock(|| async {
            let mut jobs = self.read_jobs().await?;
            let slot = jobs
                .iter_mut()
                .find(|j| j.id == job.id)
                .ok_or_else(|| StoreError::NotFound(job.id.clone()))?;
            *slot = job;
            self.write_jobs(&jobs).await
        })
        .await
    }

    /// All active jobs in a given state, in insertion order.
    pub async fn by_state(&self, state: JobState) -> StoreResult<Vec<Job>> {
        Ok(self
            .read_jobs()
            .await?
            .into_iter()
            .filter(|j| j.state == state)
            .collect())
    }

    /// All active jobs, in insertion order.
    pub async fn all(&self) -> StoreResult<Vec<Job>> {
        self.read_jobs().await
    }

    /// Move `job` from the active set to the DLQ.
    ///
    /// Appends to the DLQ first, then removes from active — the crash-safe
    /// order. A crash between the two writes leaves the job in both files;
    /// `reconcile_duplicates` resolves that in favor of the DLQ on the next
    /// `Store::open`. The two writes are deliberately *not* performed under
    /// one lock: each is independently atomic, and the recoverable
    /// duplicate window is preferred over serializing both files behind a
    /// single critical section.
    pub async fn move_to_dlq(&self, mut job: Job) -> StoreResult<()> {
        job.state = JobState::Dead;
        job.updated_at = chrono::Utc::now();

        self.with_store_lock(|| async {
            let mut dlq = self.read_dlq().await?;
            dlq.push(job.clone());
            self.write_dlq(&dlq).await
        })
        .await?;

        self.with_store_lock(|| async {
            let mut jobs = self.read_jobs().await?;
            jobs.retain(|j| j.id != job.id);
            self.write_jobs(&jobs).await
        })
        .await
    }

    /// All DLQ entries, in insertion order.
    pub async fn dlq_all(&self) -> StoreResult<Vec<Job>> {
        self.read_dlq().await
    }

    /// Look up a DLQ entry by id.
    pub async fn dlq_get(&self, id: &str) -> StoreResult<Option<Job>> {
        Ok(self.read_dlq().await?.into_iter().find(|j| j.id == id))
    }

    /// Remove an entry from the DLQ (used by `requeue_from_dlq`).
    pub async fn dlq_remove(&self, id: &str) -> StoreResult<()> {
        self.with_store_lock(|| async {
            let mut dlq = self.read_dlq().await?;
            dlq.retain(|j| j.id != id);
            self.write_dlq(&dlq).await
        })
        .await
    }

    /// Current configuration.
    pub async fn get_config(&self) -> StoreResult<Config> {
        self.read_config().await
    }

    /// Overwrite the configuration.
    pub async fn set_config(&self, config: Config) -> StoreResult<()> {
        self.with_store_lock(|| async { self.write_config(&config).await })
            .await
    }

    /// Aggregate counts across active states and the DLQ.
    pub async fn stats(&self) -> StoreResult<Stats> {
        let jobs = self.read_jobs().await?;
        let dead = self.read_dlq().await?.len();

        let mut stats = Stats {
            pending: 0,
            processing: 0,
            completed: 0,
            failed: 0,
            dead,
            total: jobs.len() + dead,
        };
        for job in &jobs {
            match job.state {
                JobState::Pending => stats.pending += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
                JobState::Dead => {}
            }
        }
        Ok(stats)
    }

    /// Try to acquire execution rights over `id`.
    ///
    /// Non-blocking: returns `Ok(None)` immediately if another worker
    /// already holds the lock, rather than waiting for it.
    pub async fn acquire_lock(&self, id: &str) -> StoreResult<Option<JobLock>> {
        let locks_dir = self.locks_dir.clone();
        let id = id.to_string();
        let guard = tokio::task::spawn_blocking(move || lock::try_acquire_job_lock(&locks_dir, &id))
            .await
            .expect("lock task panicked")?;
        Ok(guard.map(JobLock))
    }
}

async fn read_json_array<T>(path: &Path) -> StoreResult<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| StoreError::serialization(path.display().to_string(), e))
}

async fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| StoreError::serialization(path.display().to_string(), e))?;

    let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(json.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_creates_default_files() {
        let (dir, _store) = open_store().await;
        assert!(dir.path().join("jobs.json").exists());
        assert!(dir.path().join("dlq.json").exists());
        assert!(dir.path().join("config.json").exists());
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let (_dir, store) = open_store().await;
        let job = Job::new("j1", "echo hi");
        store.add(job.clone()).await.unwrap();

        let fetched = store.get("j1").await.unwrap().unwrap();
        assert_eq!(fetched, job);
    }

    #[tokio::test]
    async fn update_unknown_job_is_not_found() {
        let (_dir, store) = open_store().await;
        let err = store.update(Job::new("missing", "true")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn move_to_dlq_removes_from_active_and_appends_to_dlq() {
        let (_dir, store) = open_store().await;
        let job = Job::new("j1", "false");
        store.add(job.clone()).await.unwrap();

        store.move_to_dlq(job).await.unwrap();

        assert!(store.get("j1").await.unwrap().is_none());
        let dead = store.dlq_get("j1").await.unwrap().unwrap();
        assert_eq!(dead.state, JobState::Dead);
    }

    #[tokio::test]
    async fn stats_counts_match_collections() {
        let (_dir, store) = open_store().await;
        store.add(Job::new("a", "true")).await.unwrap();
        let mut processing = Job::new("b", "true");
        processing.state = JobState::Processing;
        store.add(processing).await.unwrap();
        store.move_to_dlq(Job::new("c", "false")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.dead, 1);
        assert_eq!(stats.total, 3);
    }

    #[tokio::test]
    async fn startup_reconciliation_drops_active_duplicate_of_dlq_entry() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("locks"))
            .await
            .unwrap();

        let mut dup = Job::new("dup", "false");
        dup.state = JobState::Dead;
        dup.attempts = dup.max_retries;

        // Simulate the crash window: present in both files at once.
        tokio::fs::write(
            dir.path().join("jobs.json"),
            serde_json::to_string(&vec![dup.clone()]).unwrap(),
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("dlq.json"),
            serde_json::to_string(&vec![dup.clone()]).unwrap(),
        )
        .await
        .unwrap();

        let store = Store::open(dir.path()).await.unwrap();
        assert!(store.get("dup").await.unwrap().is_none());
        assert!(store.dlq_get("dup").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn acquire_lock_is_exclusive_and_releases_on_drop() {
        let (_dir, store) = open_store().await;
        let first = store.acquire_lock("j1").await.unwrap();
        assert!(first.is_some());

        let second = store.acquire_lock("j1").await.unwrap();
        assert!(second.is_none());

        drop(first);
        let third = store.acquire_lock("j1").await.unwrap();
        assert!(third.is_some());
    }
}
