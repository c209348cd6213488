//! Test double for [`CommandRunner`], used to exercise the Worker's state
//! transitions without spawning real processes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::ProcessError;
use super::runner::{CommandOutcome, CommandRunner};

/// Replays a fixed, ordered sequence of scripted results, one per call to
/// `run`. Panics if called more times than results were scripted — tests
/// should script exactly as many attempts as they expect.
pub struct MockRunner {
    results: Mutex<VecDeque<Result<CommandOutcome, ProcessError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new(results: Vec<Result<CommandOutcome, ProcessError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &str, _timeout: Duration) -> Result<CommandOutcome, ProcessError> {
        self.calls.lock().unwrap().push(command.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("MockRunner called more times than results were scripted"))
    }
}
