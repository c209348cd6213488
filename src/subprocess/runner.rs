//! The external command-execution capability the core treats as opaque:
//! run a command, get back one of three outcomes, respecting a wall-clock
//! timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::error::ProcessError;

/// The three outcomes a job execution attempt can have. Deliberately flat —
/// the `Queue` state machine only ever branches on these three cases (see
/// `Worker::execute_once`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    NonZero { code: i32, stderr: String },
    Timeout,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` as a shell command, bounded by `timeout`.
    ///
    /// Any failure to even spawn the process (not found, permission
    /// denied, ...) surfaces as `Err`; a non-zero exit or a timeout is
    /// reported as `Ok(CommandOutcome::NonZero { .. })` /
    /// `Ok(CommandOutcome::Timeout)` respectively, since those are normal,
    /// expected job outcomes rather than runner failures.
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutcome, ProcessError>;
}

/// Runs commands via `sh -c <command>` using `tokio::process`.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutcome, ProcessError> {
        tracing::debug!(command, ?timeout, "spawning shell command");

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        // Dropping the future on timeout must not leave the child running.
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::CommandNotFound("sh".to_string())
            } else {
                ProcessError::Io(e)
            }
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ProcessError::Io)?,
            Err(_) => return Ok(CommandOutcome::Timeout),
        };

        if output.status.success() {
            Ok(CommandOutcome::Success)
        } else {
            let code = output.status.code().unwrap_or(1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Ok(CommandOutcome::NonZero { code, stderr })
        }
    }
}
