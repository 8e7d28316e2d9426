//! Storage errors.

use thiserror::Error;

/// Result type for backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium reported an error.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A read range ended beyond the byte image.
    #[error("cannot read {len} bytes at offset {offset}: storage holds {size} bytes")]
    ReadPastEnd {
        /// Start of the requested range.
        offset: u64,
        /// Length of the requested range.
        len: usize,
        /// Length of the byte image.
        size: u64,
    },

    /// The medium no longer matches the length recorded for it.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A write reached a backend opened for reading only.
    #[error("storage backend is read-only")]
    ReadOnly,

    /// The backend was closed.
    #[error("storage backend is closed")]
    Closed,
}
