//! Memory CRUD tools issued by the model.

use super::{
    category_arg, failure, i64_arg, memory_id_arg, record_json, require_str, store_error, str_arg,
};
use crate::tool::Tool;
use async_trait::async_trait;
use kokoro_memory::{MemoryCategory, MemoryStore, MemoryUpdate, clamp_importance};
use kokoro_protocol::{ParameterKind, ToolDefinition, ToolError, ToolParameter};
use log::debug;
use serde_json::{Value, json};
use std::sync::Arc;

/// Default number of records returned by recall.
const DEFAULT_RECALL_LIMIT: usize = 5;
/// Default number of records returned by list.
const DEFAULT_LIST_LIMIT: usize = 10;
/// Scan width when filtering one category by substring.
const CATEGORY_SCAN_LIMIT: usize = 100;
/// Importance assigned to correction records written by forget.
const CORRECTION_IMPORTANCE: u8 = 3;

fn category_values() -> Vec<&'static str> {
    MemoryCategory::ALL.iter().map(|c| c.as_str()).collect()
}

/// `store_memory` — persist a new long-term memory.
pub struct StoreMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl StoreMemoryTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for StoreMemoryTool {
    fn name(&self) -> &str {
        "store_memory"
    }

    fn description(&self) -> &str {
        "记住一条关于用户的重要信息，比如事实、偏好或者发生过的事情。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::required("content", ParameterKind::String, "要记住的内容"),
                ToolParameter::required("category", ParameterKind::String, "记忆分类")
                    .with_enum(category_values()),
                ToolParameter::optional("importance", ParameterKind::Integer, "重要度，1-10"),
                ToolParameter::optional("reason", ParameterKind::String, "记录这条记忆的原因"),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let content = match require_str(&args, "content") {
            Ok(content) => content,
            Err(envelope) => return Ok(envelope),
        };
        let category = match category_arg(&args, "category") {
            Ok(Some(category)) => category,
            Ok(None) => return Ok(failure("invalid_arguments", "缺少必填参数 category")),
            Err(envelope) => return Ok(envelope),
        };
        let importance = clamp_importance(i64_arg(&args, "importance").unwrap_or(5));
        let metadata = str_arg(&args, "reason").map(|reason| json!({ "reason": reason }));

        let record = self
            .store
            .store(&content, category, importance, metadata)
            .await
            .map_err(store_error)?;
        debug!("store_memory created record (id={})", record.id);
        Ok(json!({
            "success": true,
            "memory_id": record.id.to_string(),
            "message": format!("已记住这条{}记忆", category.label()),
        }))
    }
}

/// `recall_memory` — search stored memories by relevance or category.
pub struct RecallMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl RecallMemoryTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecallMemoryTool {
    fn name(&self) -> &str {
        "recall_memory"
    }

    fn description(&self) -> &str {
        "回忆与一个话题相关的记忆，可以按分类过滤。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::required("query", ParameterKind::String, "要回忆的话题"),
                ToolParameter::optional("limit", ParameterKind::Integer, "最多返回几条"),
                ToolParameter::optional("category", ParameterKind::String, "只在这个分类中查找")
                    .with_enum(category_values()),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let query = match require_str(&args, "query") {
            Ok(query) => query,
            Err(envelope) => return Ok(envelope),
        };
        let category = match category_arg(&args, "category") {
            Ok(category) => category,
            Err(envelope) => return Ok(envelope),
        };
        let limit = i64_arg(&args, "limit")
            .map(|value| value.max(1) as usize)
            .unwrap_or(DEFAULT_RECALL_LIMIT);

        let records = if let Some(category) = category {
            let needle = query.to_lowercase();
            self.store
                .get_by_category(category, CATEGORY_SCAN_LIMIT)
                .await
                .map_err(store_error)?
                .into_iter()
                .filter(|record| record.content.to_lowercase().contains(&needle))
                .take(limit)
                .collect::<Vec<_>>()
        } else {
            self.store
                .search(&query, limit)
                .await
                .map_err(store_error)?
                .into_iter()
                .map(|(record, _)| record)
                .collect::<Vec<_>>()
        };

        for record in &records {
            self.store
                .record_access(record.id)
                .await
                .map_err(store_error)?;
        }

        let message = if records.is_empty() {
            "没有找到相关的记忆".to_string()
        } else {
            format!("找到 {} 条相关记忆", records.len())
        };
        Ok(json!({
            "success": true,
            "memories": records.iter().map(record_json).collect::<Vec<_>>(),
            "count": records.len(),
            "message": message,
        }))
    }
}

/// `forget_memory` — soft-delete a memory, optionally leaving a correction.
pub struct ForgetMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl ForgetMemoryTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ForgetMemoryTool {
    fn name(&self) -> &str {
        "forget_memory"
    }

    fn description(&self) -> &str {
        "忘记一条不再正确或用户要求删除的记忆。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::required("memory_id", ParameterKind::String, "要忘记的记忆编号"),
                ToolParameter::optional("reason", ParameterKind::String, "忘记的原因"),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let id = match memory_id_arg(&args) {
            Ok(id) => id,
            Err(envelope) => return Ok(envelope),
        };
        let Some(record) = self.store.get_by_id(id).await.map_err(store_error)? else {
            return Ok(failure("not_found", "没有找到这条记忆"));
        };

        self.store.invalidate(id).await.map_err(store_error)?;
        if let Some(reason) = str_arg(&args, "reason") {
            let summary = format!("已忘记:{}(原因:{})", record.content, reason);
            self.store
                .store(
                    &summary,
                    MemoryCategory::Correction,
                    CORRECTION_IMPORTANCE,
                    Some(json!({ "forgotten_id": id.to_string() })),
                )
                .await
                .map_err(store_error)?;
        }
        debug!("forget_memory invalidated record (id={})", id);
        Ok(json!({
            "success": true,
            "memory_id": id.to_string(),
            "message": "已忘记这条记忆",
        }))
    }
}

/// `update_memory` — partial update of content and importance.
pub struct UpdateMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl UpdateMemoryTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateMemoryTool {
    fn name(&self) -> &str {
        "update_memory"
    }

    fn description(&self) -> &str {
        "更新一条已有记忆的内容或重要度。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::required("memory_id", ParameterKind::String, "要更新的记忆编号"),
                ToolParameter::optional("content", ParameterKind::String, "新的内容"),
                ToolParameter::optional("importance", ParameterKind::Integer, "新的重要度，1-10"),
                ToolParameter::optional("reason", ParameterKind::String, "更新的原因"),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let id = match memory_id_arg(&args) {
            Ok(id) => id,
            Err(envelope) => return Ok(envelope),
        };
        let content = str_arg(&args, "content");
        let importance = i64_arg(&args, "importance");
        if content.is_none() && importance.is_none() {
            return Ok(failure(
                "invalid_arguments",
                "需要提供新的内容或新的重要度",
            ));
        }

        let update = MemoryUpdate {
            content,
            importance: importance.map(clamp_importance),
            ..MemoryUpdate::default()
        };
        let Some(record) = self.store.update(id, update).await.map_err(store_error)? else {
            return Ok(failure("not_found", "没有找到这条记忆"));
        };
        debug!("update_memory applied (id={})", id);
        Ok(json!({
            "success": true,
            "memory": record_json(&record),
            "message": "已更新这条记忆",
        }))
    }
}

/// `list_memories` — list memories by category, importance, or recency.
pub struct ListMemoriesTool {
    store: Arc<dyn MemoryStore>,
}

impl ListMemoriesTool {
    /// Create the tool over a store handle.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListMemoriesTool {
    fn name(&self) -> &str {
        "list_memories"
    }

    fn description(&self) -> &str {
        "列出已有的记忆，可以按分类过滤，或按时间、重要度排序。"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: vec![
                ToolParameter::optional("category", ParameterKind::String, "只列出这个分类")
                    .with_enum(category_values()),
                ToolParameter::optional("sort_by", ParameterKind::String, "排序方式")
                    .with_enum(["recency", "importance"]),
                ToolParameter::optional("limit", ParameterKind::Integer, "最多返回几条"),
            ],
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let category = match category_arg(&args, "category") {
            Ok(category) => category,
            Err(envelope) => return Ok(envelope),
        };
        let limit = i64_arg(&args, "limit")
            .map(|value| value.max(1) as usize)
            .unwrap_or(DEFAULT_LIST_LIMIT);

        // category filter takes precedence and always lists newest first
        let records = if let Some(category) = category {
            self.store
                .get_by_category(category, limit)
                .await
                .map_err(store_error)?
        } else {
            match str_arg(&args, "sort_by").as_deref() {
                Some("importance") => self
                    .store
                    .get_most_important(limit)
                    .await
                    .map_err(store_error)?,
                _ => self.store.get_recent(limit).await.map_err(store_error)?,
            }
        };

        let message = if records.is_empty() {
            "还没有这类记忆".to_string()
        } else {
            format!("共 {} 条记忆", records.len())
        };
        Ok(json!({
            "success": true,
            "memories": records.iter().map(record_json).collect::<Vec<_>>(),
            "count": records.len(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kokoro_memory::{MemoryStore, SqliteMemoryStore};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn store() -> Arc<dyn MemoryStore> {
        Arc::new(SqliteMemoryStore::in_memory().expect("store"))
    }

    #[tokio::test]
    async fn store_memory_rejects_unknown_category() {
        let tool = StoreMemoryTool::new(store());
        let result = tool
            .call(json!({ "content": "喜欢猫", "category": "mood" }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["error"], json!("invalid_arguments"));
    }

    #[tokio::test]
    async fn store_memory_requires_content() {
        let tool = StoreMemoryTool::new(store());
        let result = tool
            .call(json!({ "category": "fact" }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
    }

    #[tokio::test]
    async fn store_memory_persists_and_reports_id() {
        let store = store();
        let tool = StoreMemoryTool::new(store.clone());
        let result = tool
            .call(json!({ "content": "喜欢猫", "category": "preference", "importance": 12 }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(true));

        let id = result["memory_id"].as_str().expect("id");
        let record = store
            .get_by_id(id.parse().expect("uuid"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(record.importance, 10);
        assert_eq!(record.category, MemoryCategory::Preference);
    }

    #[tokio::test]
    async fn recall_memory_rejects_category_outside_enumeration() {
        let store = store();
        store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let tool = RecallMemoryTool::new(store.clone());

        let result = tool
            .call(json!({ "query": "猫", "category": "moods" }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["error"], json!("invalid_arguments"));

        // validation failed before the store was touched
        let record = &store.get_recent(1).await.expect("recent")[0];
        assert_eq!(record.access_count, 0);
    }

    #[tokio::test]
    async fn recall_memory_records_access_on_hits() {
        let store = store();
        let seeded = store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let tool = RecallMemoryTool::new(store.clone());

        let result = tool.call(json!({ "query": "猫" })).await.expect("call");
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["count"], json!(1));

        let record = store
            .get_by_id(seeded.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(record.access_count, 1);
    }

    #[tokio::test]
    async fn recall_memory_with_category_filters_by_substring() {
        let store = store();
        store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        store
            .store("喜欢狗", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        store
            .store("养了一只猫", MemoryCategory::Fact, 5, None)
            .await
            .expect("seed");
        let tool = RecallMemoryTool::new(store);

        let result = tool
            .call(json!({ "query": "猫", "category": "preference" }))
            .await
            .expect("call");
        assert_eq!(result["count"], json!(1));
        assert_eq!(result["memories"][0]["content"], json!("喜欢猫"));
    }

    #[tokio::test]
    async fn recall_memory_empty_result_is_success() {
        let tool = RecallMemoryTool::new(store());
        let result = tool.call(json!({ "query": "猫" })).await.expect("call");
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["count"], json!(0));
        assert_eq!(result["message"], json!("没有找到相关的记忆"));
    }

    #[tokio::test]
    async fn forget_memory_reports_unknown_id() {
        let tool = ForgetMemoryTool::new(store());
        let result = tool
            .call(json!({ "memory_id": Uuid::new_v4().to_string() }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["error"], json!("not_found"));
    }

    #[tokio::test]
    async fn forget_memory_with_reason_stores_correction() {
        let store = store();
        let seeded = store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let tool = ForgetMemoryTool::new(store.clone());

        let result = tool
            .call(json!({
                "memory_id": seeded.id.to_string(),
                "reason": "其实更喜欢狗",
            }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(true));

        let forgotten = store
            .get_by_id(seeded.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(forgotten.valid, false);

        let corrections = store
            .get_by_category(MemoryCategory::Correction, 10)
            .await
            .expect("corrections");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].importance, 3);
        assert!(corrections[0].content.contains("喜欢猫"));
        assert!(corrections[0].content.contains("其实更喜欢狗"));
    }

    #[tokio::test]
    async fn update_memory_requires_content_or_importance() {
        let store = store();
        let seeded = store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let tool = UpdateMemoryTool::new(store);

        let result = tool
            .call(json!({ "memory_id": seeded.id.to_string() }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["error"], json!("invalid_arguments"));
    }

    #[tokio::test]
    async fn update_memory_applies_partial_update() {
        let store = store();
        let seeded = store
            .store("喜欢猫", MemoryCategory::Preference, 5, None)
            .await
            .expect("seed");
        let tool = UpdateMemoryTool::new(store.clone());

        let result = tool
            .call(json!({ "memory_id": seeded.id.to_string(), "importance": 9 }))
            .await
            .expect("call");
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["memory"]["importance"], json!(9));
        assert_eq!(result["memory"]["content"], json!("喜欢猫"));
    }

    #[tokio::test]
    async fn list_memories_category_overrides_sort() {
        let store = store();
        store
            .store("低重要度偏好", MemoryCategory::Preference, 2, None)
            .await
            .expect("seed");
        store
            .store("高重要度事实", MemoryCategory::Fact, 9, None)
            .await
            .expect("seed");
        let tool = ListMemoriesTool::new(store);

        let result = tool
            .call(json!({ "category": "preference", "sort_by": "importance" }))
            .await
            .expect("call");
        assert_eq!(result["count"], json!(1));
        assert_eq!(result["memories"][0]["content"], json!("低重要度偏好"));
    }

    #[tokio::test]
    async fn list_memories_sorts_by_importance_when_asked() {
        let store = store();
        store
            .store("小事", MemoryCategory::Context, 2, None)
            .await
            .expect("seed");
        store
            .store("大事", MemoryCategory::Event, 9, None)
            .await
            .expect("seed");
        let tool = ListMemoriesTool::new(store);

        let result = tool
            .call(json!({ "sort_by": "importance" }))
            .await
            .expect("call");
        assert_eq!(result["memories"][0]["content"], json!("大事"));
    }
}
