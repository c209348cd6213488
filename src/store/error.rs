//! Error types for the job store.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {file}: {source}")]
    Serialization {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("job not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn serialization(file: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            file: file.into(),
            source,
        }
    }
}
