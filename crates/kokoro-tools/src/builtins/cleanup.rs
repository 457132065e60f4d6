//! Memory cleanup tool: duplicate, outdated, and low-importance sweeps.

use super::{bool_arg, failure, store_error, str_arg};
use crate::tool::Tool;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use kokoro_memory::{MemoryCategory, MemoryRecord, MemoryStore};
use kokoro_protocol::{ParameterKind, ToolDefinition, ToolError, ToolParameter};
use log::info;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// How many of the most recent valid records one sweep inspects.
const SCAN_LIMIT: usize = 100;
/// Normalized-content prefix length used for duplicate grouping.
const NORMALIZED_PREFIX_CHARS: usize = 50;
/// Age threshold for the outdated sweep.
const OUTDATED_AGE_DAYS: i64 = 30;

/// Cleanup strategies accepted by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Duplicates,
    Outdated,
    LowImportance,
    All,
}

impl Strategy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "duplicates" => Some(Strategy::Duplicates),
            "outdated" => Some(Strategy::Outdated),
            "low_importance" => Some(Strategy::LowImportance),
            "all" => Some(Strategy::All),
            _ => None,
        }
    }
}

/// A record flagged for removal, with the reason shown to the user.
struct Flagged {
    id: Uuid,
    content: String,
    reason: &'static str,
}

/// `cleanup_memories` — analyze recent records and invalidate stale ones.
pub struct CleanupMemoriesTool {
    store: Arc<dyn MemoryStore>,
}

impl CleanupMemoriesTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CleanupMemoriesTool {
    fn name(&self) -> &str {
        "cleanup_memories"
    }

    fn description(&self) -> &str {
        "清理重复、过时或不重要的记忆。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::optional("strategy", ParameterKind::String, "清理策略")
                    .with_enum(["duplicates", "outdated", "low_importance", "all"]),
                ToolParameter::optional(
                    "dry_run",
                    ParameterKind::Boolean,
                    "只预览将被清理的记忆，不真正清理",
                ),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let strategy = match str_arg(&args, "strategy") {
            Some(raw) => match Strategy::parse(&raw) {
                Some(strategy) => strategy,
                None => {
                    return Ok(failure(
                        "invalid_arguments",
                        format!("无效的清理策略：{raw}"),
                    ));
                }
            },
            None => Strategy::All,
        };
        let dry_run = bool_arg(&args, "dry_run").unwrap_or(false);

        let records = self
            .store
            .get_recent(SCAN_LIMIT)
            .await
            .map_err(store_error)?;
        let flagged = flag_records(&records, strategy);

        if !dry_run {
            for entry in &flagged {
                self.store.invalidate(entry.id).await.map_err(store_error)?;
            }
            info!(
                "cleanup invalidated records (strategy={:?}, count={})",
                strategy,
                flagged.len()
            );
        }

        let message = if dry_run {
            format!("发现 {} 条可清理的记忆", flagged.len())
        } else {
            format!("已清理 {} 条记忆", flagged.len())
        };
        Ok(json!({
            "success": true,
            "dry_run": dry_run,
            "count": flagged.len(),
            "cleaned": flagged
                .iter()
                .map(|entry| json!({
                    "id": entry.id.to_string(),
                    "content": entry.content,
                    "reason": entry.reason,
                }))
                .collect::<Vec<_>>(),
            "message": message,
        }))
    }
}

/// Apply a strategy over the scanned records, deduplicated by id.
fn flag_records(records: &[MemoryRecord], strategy: Strategy) -> Vec<Flagged> {
    let mut flagged = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |record: &MemoryRecord, reason: &'static str, out: &mut Vec<Flagged>| {
        if seen.insert(record.id) {
            out.push(Flagged {
                id: record.id,
                content: record.content.clone(),
                reason,
            });
        }
    };

    if matches!(strategy, Strategy::Duplicates | Strategy::All) {
        for record in duplicate_records(records) {
            push(record, "重复内容", &mut flagged);
        }
    }
    if matches!(strategy, Strategy::Outdated | Strategy::All) {
        let cutoff = Utc::now() - Duration::days(OUTDATED_AGE_DAYS);
        for record in records.iter().filter(|record| {
            record.created_at < cutoff
                && record.access_count < 3
                && record.importance <= 4
                && record.category != MemoryCategory::Fact
        }) {
            push(record, "过时且很少使用", &mut flagged);
        }
    }
    if matches!(strategy, Strategy::LowImportance | Strategy::All) {
        for record in records.iter().filter(|record| {
            record.importance <= 2
                && record.access_count < 2
                && record.category == MemoryCategory::Context
        }) {
            push(record, "重要性低", &mut flagged);
        }
    }
    flagged
}

/// Group by normalized content and flag everything but the most important
/// member of each group.
fn duplicate_records(records: &[MemoryRecord]) -> Vec<&MemoryRecord> {
    let mut groups: HashMap<String, Vec<&MemoryRecord>> = HashMap::new();
    for record in records {
        groups
            .entry(normalize_content(&record.content))
            .or_default()
            .push(record);
    }

    let mut duplicates = Vec::new();
    for group in groups.values() {
        if group.len() < 2 {
            continue;
        }
        let mut keep = group[0];
        for record in group.iter().skip(1).copied() {
            if record.importance > keep.importance {
                keep = record;
            }
        }
        for record in group {
            if record.id != keep.id {
                duplicates.push(*record);
            }
        }
    }
    // group iteration order is arbitrary; make the output deterministic
    duplicates.sort_by_key(|record| record.id);
    duplicates
}

/// Normalize content for duplicate grouping: alphanumeric (including CJK)
/// characters only, lowercased, truncated to a fixed prefix.
fn normalize_content(content: &str) -> String {
    content
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .take(NORMALIZED_PREFIX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CleanupMemoriesTool, normalize_content};
    use crate::tool::Tool;
    use kokoro_memory::{MemoryCategory, MemoryStore, SqliteMemoryStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> Arc<dyn MemoryStore> {
        Arc::new(SqliteMemoryStore::in_memory().expect("store"))
    }

    #[test]
    fn normalize_strips_punctuation_and_lowercases() {
        assert_eq!(normalize_content("喜欢猫!"), "喜欢猫");
        assert_eq!(normalize_content("喜欢猫 "), "喜欢猫");
        assert_eq!(normalize_content("Likes CATS!!"), "likescats");
    }

    #[tokio::test]
    async fn duplicates_keep_highest_importance() {
        let store = store();
        let low = store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let keep = store
            .store("喜欢猫!", MemoryCategory::Preference, 9, None)
            .await
            .expect("seed");
        let lowest = store
            .store("喜欢猫 ", MemoryCategory::Preference, 3, None)
            .await
            .expect("seed");
        let tool = CleanupMemoriesTool::new(store.clone());

        let result = tool
            .call(json!({ "strategy": "duplicates", "dry_run": false }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["count"], json!(2));

        let keep_record = store.get_by_id(keep.id).await.expect("get").expect("row");
        assert_eq!(keep_record.valid, true);
        let low_record = store.get_by_id(low.id).await.expect("get").expect("row");
        assert_eq!(low_record.valid, false);
        let lowest_record = store
            .get_by_id(lowest.id)
            .await
            .expect("get")
            .expect("row");
        assert_eq!(lowest_record.valid, false);
    }

    #[tokio::test]
    async fn dry_run_reports_same_set_without_invalidating() {
        let store = store();
        store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        store
            .store("喜欢猫!", MemoryCategory::Preference, 9, None)
            .await
            .expect("seed");
        let tool = CleanupMemoriesTool::new(store.clone());

        let preview = tool
            .call(json!({ "strategy": "duplicates", "dry_run": true }))
            .await
            .expect("preview");
        assert_eq!(preview["count"], json!(1));
        assert_eq!(store.get_count().await.expect("count"), 2);

        let cleanup = tool
            .call(json!({ "strategy": "duplicates", "dry_run": false }))
            .await
            .expect("cleanup");
        assert_eq!(cleanup["count"], preview["count"]);
        assert_eq!(cleanup["cleaned"], preview["cleaned"]);
        assert_eq!(store.get_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn low_importance_sweep_only_touches_context() {
        let store = store();
        store
            .store("随口一提的小事", MemoryCategory::Context, 1, None)
            .await
            .expect("seed");
        store
            .store("不重要但是事实", MemoryCategory::Fact, 1, None)
            .await
            .expect("seed");
        let tool = CleanupMemoriesTool::new(store.clone());

        let result = tool
            .call(json!({ "strategy": "low_importance" }))
            .await
            .expect("call");
        assert_eq!(result["count"], json!(1));
        assert_eq!(
            result["cleaned"][0]["content"],
            json!("随口一提的小事")
        );
        assert_eq!(store.get_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn all_strategy_does_not_flag_twice() {
        let store = store();
        // low importance context record that also matches the duplicate sweep
        store
            .store("看了一部电影", MemoryCategory::Context, 1, None)
            .await
            .expect("seed");
        store
            .store("看了一部电影!", MemoryCategory::Context, 2, None)
            .await
            .expect("seed");
        let tool = CleanupMemoriesTool::new(store);

        let result = tool
            .call(json!({ "strategy": "all", "dry_run": true }))
            .await
            .expect("call");
        // first record: duplicate of the higher-importance copy AND
        // low-importance context; it must appear exactly once
        assert_eq!(result["count"], json!(2));
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected() {
        let tool = CleanupMemoriesTool::new(store());
        let result = tool
            .call(json!({ "strategy": "aggressive" }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
    }
}
