use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures reported by a durable backend.
///
/// Payloads are rendered messages so the error stays `Clone` and never leaks
/// driver types across crate boundaries.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("record serialization failed: {0}")]
    Serialization(String),
    #[error("storage io failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failures surfaced by the URL store to its callers.
///
/// Backend trouble is absorbed by the store and never shows up here; these
/// are request validation and lifecycle errors only.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("short code must not be empty")]
    EmptyKey,
    #[error("delete queue is closed")]
    QueueClosed,
    #[error("sequence space exhausted")]
    SequencesExhausted,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
