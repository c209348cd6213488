//! Error types for the external command runner.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
