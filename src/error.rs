/// Error types for the tracker and its collaborators
use thiserror::Error;

/// Durable storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("stored data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Browser tab query failures
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("tab query failed: {0}")]
    Failed(String),

    #[error("tab data is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type StoreResult<T> = Result<T, StoreError>;
