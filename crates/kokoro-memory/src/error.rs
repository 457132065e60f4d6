//! Error types for memory operations.

/// Errors returned by the memory store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Underlying persistent storage failed to open or transact.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
    /// The on-disk schema could not be brought to the supported version.
    #[error("schema migration failed: {0}")]
    Migration(String),
    /// Caller supplied invalid input (empty content, bad category).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Stored column could not be decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
