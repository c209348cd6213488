//! Spawns and supervises N independent worker processes.
//!
//! The supervisor holds no in-memory state shared with the workers it
//! spawns; everything they coordinate through is the `Store` on disk. Its
//! only job is process lifecycle: start N children, wait for them, and on
//! an interrupt signal forward it to each child, give them a grace period
//! to exit, and hard-kill whatever's left.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal as unix_signal, SignalKind};

/// Grace period after SIGTERM before a straggling worker is SIGKILLed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Spawn `count` worker processes (each a re-exec of the current binary
/// running the hidden `internal-worker-run` subcommand) and wait for all
/// of them to exit, forwarding interrupt/terminate signals as they arrive.
pub async fn run(count: u32, data_dir: &Path, verbose: u8) -> Result<()> {
    let exe = std::env::current_exe().context("failed to resolve current executable")?;

    let mut children = Vec::with_capacity(count as usize);
    for id in 1..=count {
        let mut cmd = Command::new(&exe);
        cmd.arg("internal-worker-run").arg("--id").arg(id.to_string());
        cmd.env("QUEUECTL_DATA_DIR", data_dir);
        for _ in 0..verbose {
            cmd.arg("-v");
        }
        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn worker {id}"))?;
        children.push(child);
    }

    let mut sigterm = unix_signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    // Each branch only logs; none of them touch `children` while the
    // `wait_all` branch's future (which holds children.iter_mut()) is
    // still alive. Shutdown, if needed, happens after the select
    // expression has fully resolved and released that borrow.
    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt, shutting down workers");
            true
        }
        _ = sigterm.recv() => {
            tracing::info!("received terminate signal, shutting down workers");
            true
        }
        _ = wait_all(&mut children) => {
            tracing::info!("all workers exited");
            false
        }
    };

    if interrupted {
        shutdown(&mut children).await;
    }

    Ok(())
}

async fn wait_all(children: &mut [Child]) {
    join_all(children.iter_mut().map(|c| c.wait())).await;
}

/// Send SIGTERM to every child, wait up to [`SHUTDOWN_GRACE`], then
/// SIGKILL whatever is still alive.
async fn shutdown(children: &mut [Child]) {
    for child in children.iter() {
        if let Some(pid) = child.id() {
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }

    for child in children.iter_mut() {
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(pid = ?child.id(), "worker did not exit within grace period, killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }
}
