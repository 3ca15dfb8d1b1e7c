//! Error types for TaskNote storage

use crate::persons::MAX_NAME_LEN;

/// Host storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The host storage backend could not be reached
    #[error("host storage unavailable: {0}")]
    Unavailable(String),

    /// A blob could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested task does not exist in the reminder blob
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The requested block does not exist in the host
    #[error("block not found: {0}")]
    BlockNotFound(String),
}

/// Person directory validation and lookup errors
///
/// Validation is synchronous and rejected before any write happens, so a
/// failed mutation never leaves a partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum PersonError {
    /// Name was empty after trimming
    #[error("person name must not be empty")]
    EmptyName,

    /// Name exceeded the maximum length
    #[error("person name must not exceed {MAX_NAME_LEN} characters")]
    NameTooLong,

    /// Another person already uses this name (case-insensitive)
    #[error("person name already exists: {0}")]
    DuplicateName(String),

    /// No person with the given id
    #[error("person not found: {0}")]
    NotFound(String),

    /// A reorder did not match the current directory contents
    #[error("reordered ids do not match the current directory")]
    ReorderMismatch,

    /// Persisting the directory failed
    #[error("saving persons failed: {0}")]
    Storage(#[from] StoreError),
}
