//! `queuectl internal-worker-run --id N`
//!
//! Runs a single worker in the foreground. Invoked only by the supervisor
//! (`worker start --count N` re-execs this binary once per worker); not a
//! documented part of the user-facing CLI surface.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::store::Store;
use crate::subprocess::ShellRunner;
use crate::worker::Worker;

pub async fn run_internal_worker(id: u32, data_dir: &Path) -> Result<()> {
    let store = Store::open(data_dir)
        .await
        .context("failed to open job store")?;

    let running = Arc::new(AtomicBool::new(true));
    install_shutdown_handler(running.clone())?;

    let worker = Worker::new(id, store, ShellRunner, running);
    worker.run().await;
    Ok(())
}

/// Listen for SIGINT/SIGTERM on a background thread and clear `running`
/// when either arrives. The poll loop finishes whatever job it is
/// currently executing and exits on its next iteration boundary; there is
/// no cooperative cancellation of an in-flight command.
fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handler")?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            running.store(false, Ordering::SeqCst);
        }
    });

    Ok(())
}
