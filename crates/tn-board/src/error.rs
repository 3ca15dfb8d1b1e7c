//! Error types for TaskNote board

use tn_store::StoreError;

/// Board reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The host storage layer failed during a reload
    #[error(transparent)]
    Store(#[from] StoreError),
}
