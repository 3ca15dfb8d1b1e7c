//! Error types for TaskNote sync

/// Broadcast transport errors
///
/// All of these are treated as degradations, never as fatal conditions: a
/// client that cannot reach the channel keeps working in local-only mode.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The HTTP request to the host failed
    #[error("broadcast request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport could not deliver or receive
    #[error("broadcast transport failed: {0}")]
    Transport(String),
}
