//! Durable long-term memory store for the kokoro companion.

pub mod error;
pub mod model;
pub mod search;
pub mod store;

/// Memory error type.
pub use error::MemoryError;
/// Memory record model, categories, and partial updates.
pub use model::{MemoryCategory, MemoryRecord, MemoryUpdate, UnknownCategory, clamp_importance};
/// Tokenization and keyword extraction helpers.
pub use search::{extract_keywords, tokenize};
/// Store interface and the SQLite-backed implementation.
pub use store::{MemoryStore, SqliteMemoryStore};
