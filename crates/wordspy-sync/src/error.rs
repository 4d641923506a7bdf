//! Error types for the sync layer.

/// Errors from the snapshot store or change bus.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The backing store or bus could not be reached.
    #[error("sync backend unavailable: {0}")]
    Unavailable(String),

    /// A snapshot failed to encode or decode.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
