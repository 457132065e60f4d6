//! Memory store helpers for tests.

use kokoro_memory::SqliteMemoryStore;

/// In-memory store for isolated test instances.
pub fn temp_store() -> SqliteMemoryStore {
    SqliteMemoryStore::in_memory().expect("in-memory store")
}
