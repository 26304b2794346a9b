//! Storage error types.

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested path or key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path escapes the store root or contains illegal components.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
