//! OS-level advisory locking used to coordinate independent worker
//! processes sharing one data directory.
//!
//! Two distinct locks are built on the same primitive:
//!
//! - a per-job lock (`locks/<id>.lock`), acquired non-blocking, conferring
//!   execution rights over exactly one job to exactly one worker;
//! - a short-lived, whole-store lock (`locks/.store.lock`), acquired
//!   blocking, held only across one read-modify-rewrite of the job files so
//!   that two workers mutating *different* jobs can't tear each other's
//!   writes.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use super::error::StoreResult;

/// A held advisory lock. Releases on drop; `release` is available for
/// callers that want the unlock to happen at an explicit point.
///
/// Unlocking never removes the lock file: deleting it here would open a
/// flock-then-unlink race where a concurrent waiter still holds the lock
/// on the old inode while a new acquirer creates and locks a fresh one,
/// and both would believe they hold exclusive rights.
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    fn new(file: File) -> Self {
        Self { file }
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
}

/// Try to acquire the per-job lock for `id` under `locks_dir`.
///
/// Non-blocking: returns `Ok(None)` immediately if another process already
/// holds it, rather than waiting. This is a blocking filesystem call and
/// must be run via `spawn_blocking` from async contexts.
pub fn try_acquire_job_lock(locks_dir: &Path, id: &str) -> StoreResult<Option<LockGuard>> {
    let path = locks_dir.join(format!("{id}.lock"));
    let file = open_lock_file(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(LockGuard::new(file))),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Acquire the whole-store lock, blocking until it's available.
///
/// Held only for the duration of one read-modify-rewrite; callers must
/// drop the guard as soon as the rewrite is durable.
pub fn acquire_store_lock(locks_dir: &Path) -> StoreResult<LockGuard> {
    let path = locks_dir.join(".store.lock");
    let file = open_lock_file(&path)?;
    file.lock_exclusive()?;
    Ok(LockGuard::new(file))
}
