//! SQLite-backed memory store with a lazily built search index.

use crate::error::MemoryError;
use crate::model::{MemoryCategory, MemoryRecord, MemoryUpdate, clamp_importance};
use crate::search::{
    InvertedIndex, extract_keywords, fallback_candidates, relevance_score, tokenize,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde_json::json;
use std::cmp::Ordering;
use std::path::Path;
use uuid::Uuid;

/// Current on-disk schema version.
const SCHEMA_VERSION: i64 = 2;

/// Durable CRUD over memory records plus relevance search.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist a new record; fails on empty content; importance is clamped.
    async fn store(
        &self,
        content: &str,
        category: MemoryCategory,
        importance: u8,
        metadata: Option<serde_json::Value>,
    ) -> Result<MemoryRecord, MemoryError>;

    /// Rank valid records against a query; an empty query yields no results.
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, MemoryError>;

    /// Valid records in one category, most recent first.
    async fn get_by_category(
        &self,
        category: MemoryCategory,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Valid records by descending importance.
    async fn get_most_important(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Valid records by descending creation time.
    async fn get_recent(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Bump access count and refresh the access timestamp; no-op if unknown.
    async fn record_access(&self, id: Uuid) -> Result<(), MemoryError>;

    /// Soft-delete a record; idempotent; no-op if unknown.
    async fn invalidate(&self, id: Uuid) -> Result<(), MemoryError>;

    /// Physically remove a record and its index entries; no-op if unknown.
    async fn delete(&self, id: Uuid) -> Result<(), MemoryError>;

    /// Apply a partial update; `None` if the id is unknown.
    async fn update(
        &self,
        id: Uuid,
        update: MemoryUpdate,
    ) -> Result<Option<MemoryRecord>, MemoryError>;

    /// Count of valid records.
    async fn get_count(&self) -> Result<usize, MemoryError>;

    /// Fetch a record by id regardless of validity.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<MemoryRecord>, MemoryError>;

    /// Valid record counts per category.
    async fn category_counts(&self) -> Result<Vec<(MemoryCategory, usize)>, MemoryError>;

    /// Remove every record and reset the search index.
    async fn clear_all(&self) -> Result<(), MemoryError>;
}

/// SQLite-backed implementation of [`MemoryStore`].
///
/// The inverted search index is a rebuildable projection of the record
/// table: built from a full scan on first search, maintained incrementally
/// afterwards. The `Mutex<Option<_>>` guard makes the build exactly-once
/// even under concurrent first access.
pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
    index: Mutex<Option<InvertedIndex>>,
}

impl SqliteMemoryStore {
    /// Open (and migrate if needed) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let mut conn = Connection::open(path.as_ref())?;
        init_schema(&mut conn)?;
        info!(
            "opened memory store (path={}, schema_version={})",
            path.as_ref().display(),
            SCHEMA_VERSION
        );
        Ok(Self {
            conn: Mutex::new(conn),
            index: Mutex::new(None),
        })
    }

    /// Open an in-memory store, mainly for tests and previews.
    pub fn in_memory() -> Result<Self, MemoryError> {
        let mut conn = Connection::open_in_memory()?;
        init_schema(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            index: Mutex::new(None),
        })
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn store(
        &self,
        content: &str,
        category: MemoryCategory,
        importance: u8,
        metadata: Option<serde_json::Value>,
    ) -> Result<MemoryRecord, MemoryError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MemoryError::InvalidInput(
                "memory content must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        let record = MemoryRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            category,
            importance: clamp_importance(i64::from(importance)),
            keywords: extract_keywords(content),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            valid: true,
            metadata: metadata.unwrap_or_else(|| json!({})),
        };

        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO memories (id, content, category, importance, keywords, \
                 created_at, last_accessed_at, access_count, valid, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.to_string(),
                    record.content,
                    record.category.as_str(),
                    i64::from(record.importance),
                    serde_json::to_string(&record.keywords)?,
                    record.created_at,
                    record.last_accessed_at,
                    i64::from(record.access_count),
                    1i64,
                    serde_json::to_string(&record.metadata)?,
                ],
            )?;
        }
        if let Some(index) = self.index.lock().as_mut() {
            index.add(&record);
        }
        debug!(
            "stored memory record (id={}, category={}, importance={})",
            record.id,
            record.category.as_str(),
            record.importance
        );
        Ok(record)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, MemoryError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let tokens = tokenize(query);
        let conn = self.conn.lock();
        let candidates = if tokens.is_empty() {
            let records = load_valid_records(&conn)?;
            fallback_candidates(&records, query)
        } else {
            let mut guard = self.index.lock();
            if guard.is_none() {
                debug!("building memory search index");
                *guard = Some(build_index(&conn)?);
            }
            match guard.as_ref() {
                Some(index) => index.candidates(&tokens),
                None => Vec::new(),
            }
        };

        let now = Utc::now();
        let mut scored = Vec::new();
        for (rank, id) in candidates.into_iter().enumerate() {
            let Some(record) = fetch_record(&conn, id)? else {
                continue;
            };
            if !record.valid {
                continue;
            }
            let score = relevance_score(&record, rank, query, now);
            scored.push((record, score));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        debug!(
            "memory search (query_len={}, returned={})",
            query.len(),
            scored.len()
        );
        Ok(scored)
    }

    async fn get_by_category(
        &self,
        category: MemoryCategory,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content, category, importance, keywords, created_at, \
             last_accessed_at, access_count, valid, metadata \
             FROM memories WHERE category = ?1 AND valid = 1 \
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![category.as_str(), limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn get_most_important(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content, category, importance, keywords, created_at, \
             last_accessed_at, access_count, valid, metadata \
             FROM memories WHERE valid = 1 \
             ORDER BY importance DESC, created_at DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content, category, importance, keywords, created_at, \
             last_accessed_at, access_count, valid, metadata \
             FROM memories WHERE valid = 1 \
             ORDER BY created_at DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn record_access(&self, id: Uuid) -> Result<(), MemoryError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed_at = ?1 \
             WHERE id = ?2",
            params![Utc::now(), id.to_string()],
        )?;
        Ok(())
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), MemoryError> {
        let changed = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE memories SET valid = 0 WHERE id = ?1",
                params![id.to_string()],
            )?
        };
        if let Some(index) = self.index.lock().as_mut() {
            index.remove(id);
        }
        if changed > 0 {
            debug!("invalidated memory record (id={})", id);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), MemoryError> {
        let changed = {
            let conn = self.conn.lock();
            conn.execute(
                "DELETE FROM memories WHERE id = ?1",
                params![id.to_string()],
            )?
        };
        if let Some(index) = self.index.lock().as_mut() {
            index.remove(id);
        }
        if changed > 0 {
            debug!("deleted memory record (id={})", id);
        }
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        update: MemoryUpdate,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        let Some(mut record) = fetch_record(&conn, id)? else {
            return Ok(None);
        };

        if let Some(content) = &update.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(MemoryError::InvalidInput(
                    "memory content must not be empty".to_string(),
                ));
            }
            record.content = content.to_string();
            record.keywords = extract_keywords(&record.content);
        }
        if let Some(importance) = update.importance {
            record.importance = clamp_importance(i64::from(importance));
        }
        if let Some(category) = update.category {
            record.category = category;
        }
        if let Some(valid) = update.valid {
            record.valid = valid;
        }

        conn.execute(
            "UPDATE memories SET content = ?1, category = ?2, importance = ?3, \
             keywords = ?4, valid = ?5 WHERE id = ?6",
            params![
                record.content,
                record.category.as_str(),
                i64::from(record.importance),
                serde_json::to_string(&record.keywords)?,
                i64::from(record.valid),
                id.to_string(),
            ],
        )?;
        drop(conn);

        if let Some(index) = self.index.lock().as_mut() {
            if record.valid {
                index.replace(&record);
            } else {
                index.remove(id);
            }
        }
        debug!("updated memory record (id={})", id);
        Ok(Some(record))
    }

    async fn get_count(&self) -> Result<usize, MemoryError> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memories WHERE valid = 1", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        fetch_record(&conn, id)
    }

    async fn category_counts(&self) -> Result<Vec<(MemoryCategory, usize)>, MemoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM memories WHERE valid = 1 GROUP BY category",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            let (category, count) = row?;
            let category = MemoryCategory::parse(&category)
                .map_err(|err| MemoryError::Migration(err.to_string()))?;
            counts.push((category, count as usize));
        }
        Ok(counts)
    }

    async fn clear_all(&self) -> Result<(), MemoryError> {
        {
            let conn = self.conn.lock();
            conn.execute("DELETE FROM memories", [])?;
        }
        if let Some(index) = self.index.lock().as_mut() {
            index.clear();
        }
        info!("cleared all memory records");
        Ok(())
    }
}

/// Create or upgrade the on-disk schema.
fn init_schema(conn: &mut Connection) -> Result<(), MemoryError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(MemoryError::Migration(format!(
            "database schema version {version} is newer than supported {SCHEMA_VERSION}"
        )));
    }
    if version == 1 {
        migrate_v1_validity(conn)?;
    }
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            importance INTEGER NOT NULL,
            keywords TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_accessed_at TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            valid INTEGER NOT NULL DEFAULT 1,
            metadata TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
        CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance);
        CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);
        CREATE INDEX IF NOT EXISTS idx_memories_last_accessed_at ON memories(last_accessed_at);
        CREATE INDEX IF NOT EXISTS idx_memories_valid ON memories(valid);",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Migrate a version-1 database: the legacy schema stored validity as the
/// text booleans `'true'`/`'false'`. Every record is scanned and rewritten
/// into a rebuilt table with integer-encoded validity.
fn migrate_v1_validity(conn: &mut Connection) -> Result<(), MemoryError> {
    info!("migrating memory store schema (from=1, to=2)");
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE memories_migrated (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            importance INTEGER NOT NULL,
            keywords TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_accessed_at TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            valid INTEGER NOT NULL DEFAULT 1,
            metadata TEXT NOT NULL DEFAULT '{}'
        );",
    )?;
    let mut total = 0usize;
    {
        let mut stmt = tx.prepare(
            "SELECT id, content, category, importance, keywords, created_at, \
             last_accessed_at, access_count, valid, metadata FROM memories",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let valid = match row.get_ref(8)? {
                rusqlite::types::ValueRef::Integer(value) => i64::from(value != 0),
                rusqlite::types::ValueRef::Text(text) => {
                    i64::from(text == b"true" || text == b"1")
                }
                _ => 0,
            };
            tx.execute(
                "INSERT INTO memories_migrated VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                    valid,
                    row.get::<_, String>(9)?,
                ],
            )?;
            total += 1;
        }
    }
    tx.execute_batch(
        "DROP TABLE memories;
         ALTER TABLE memories_migrated RENAME TO memories;",
    )?;
    tx.commit()?;
    info!("memory schema migration complete (records={})", total);
    Ok(())
}

/// Map a full row into a memory record.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;
    let category: String = row.get(2)?;
    let category = MemoryCategory::parse(&category)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    let keywords: String = row.get(4)?;
    let keywords: Vec<String> = serde_json::from_str(&keywords)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?;
    let metadata: String = row.get(9)?;
    let metadata: serde_json::Value = serde_json::from_str(&metadata)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(err)))?;

    Ok(MemoryRecord {
        id,
        content: row.get(1)?,
        category,
        importance: row.get::<_, i64>(3)?.clamp(1, 10) as u8,
        keywords,
        created_at: row.get::<_, DateTime<Utc>>(5)?,
        last_accessed_at: row.get::<_, DateTime<Utc>>(6)?,
        access_count: row.get::<_, i64>(7)?.max(0) as u32,
        valid: row.get::<_, i64>(8)? != 0,
        metadata,
    })
}

/// Fetch a single record by id, regardless of validity.
fn fetch_record(conn: &Connection, id: Uuid) -> Result<Option<MemoryRecord>, MemoryError> {
    let mut stmt = conn.prepare(
        "SELECT id, content, category, importance, keywords, created_at, \
         last_accessed_at, access_count, valid, metadata \
         FROM memories WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_record)?;
    match rows.next() {
        Some(record) => Ok(Some(record?)),
        None => Ok(None),
    }
}

/// Load every valid record, in creation order.
fn load_valid_records(conn: &Connection) -> Result<Vec<MemoryRecord>, MemoryError> {
    let mut stmt = conn.prepare(
        "SELECT id, content, category, importance, keywords, created_at, \
         last_accessed_at, access_count, valid, metadata \
         FROM memories WHERE valid = 1 ORDER BY created_at ASC",
    )?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Build the inverted index from a full scan of valid records.
fn build_index(conn: &Connection) -> Result<InvertedIndex, MemoryError> {
    let mut index = InvertedIndex::new();
    for record in load_valid_records(conn)? {
        index.add(&record);
    }
    Ok(index)
}
