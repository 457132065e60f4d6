//! Built-in memory tools and shared argument/envelope helpers.

mod cleanup;
mod memory;

pub use cleanup::CleanupMemoriesTool;
pub use memory::{
    ForgetMemoryTool, ListMemoriesTool, RecallMemoryTool, StoreMemoryTool, UpdateMemoryTool,
};

use crate::tool::Tool;
use kokoro_memory::{MemoryCategory, MemoryError, MemoryRecord, MemoryStore};
use kokoro_protocol::ToolError;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Build the full built-in memory tool set over one store.
pub fn builtin_memory_tools(store: Arc<dyn MemoryStore>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(StoreMemoryTool::new(store.clone())),
        Arc::new(RecallMemoryTool::new(store.clone())),
        Arc::new(ForgetMemoryTool::new(store.clone())),
        Arc::new(UpdateMemoryTool::new(store.clone())),
        Arc::new(ListMemoriesTool::new(store.clone())),
        Arc::new(CleanupMemoriesTool::new(store)),
    ]
}

/// Structured failure envelope with a user-facing message.
pub(crate) fn failure(error: &str, message: impl Into<String>) -> Value {
    json!({
        "success": false,
        "error": error,
        "message": message.into(),
    })
}

/// Wrap a store failure into a tool execution error.
pub(crate) fn store_error(err: MemoryError) -> ToolError {
    ToolError::ExecutionFailed(err.to_string())
}

/// Compact JSON view of a record for tool responses.
pub(crate) fn record_json(record: &MemoryRecord) -> Value {
    json!({
        "id": record.id.to_string(),
        "content": record.content,
        "category": record.category.as_str(),
        "importance": record.importance,
    })
}

/// Read an optional string argument.
pub(crate) fn str_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|value| !value.trim().is_empty())
}

/// Read an optional integer argument.
pub(crate) fn i64_arg(args: &Value, name: &str) -> Option<i64> {
    args.get(name).and_then(Value::as_i64)
}

/// Read an optional boolean argument.
pub(crate) fn bool_arg(args: &Value, name: &str) -> Option<bool> {
    args.get(name).and_then(Value::as_bool)
}

/// Read a required string argument, or produce a failure envelope.
pub(crate) fn require_str(args: &Value, name: &str) -> Result<String, Value> {
    str_arg(args, name).ok_or_else(|| {
        failure(
            "invalid_arguments",
            format!("缺少必填参数 {name}"),
        )
    })
}

/// Parse an optional category argument against the closed enumeration.
pub(crate) fn category_arg(args: &Value, name: &str) -> Result<Option<MemoryCategory>, Value> {
    let Some(raw) = str_arg(args, name) else {
        return Ok(None);
    };
    match MemoryCategory::parse(&raw) {
        Ok(category) => Ok(Some(category)),
        Err(_) => Err(failure(
            "invalid_arguments",
            format!("无效的记忆分类：{raw}"),
        )),
    }
}

/// Parse the required memory id argument.
pub(crate) fn memory_id_arg(args: &Value) -> Result<Uuid, Value> {
    let raw = require_str(args, "memory_id")?;
    Uuid::parse_str(&raw)
        .map_err(|_| failure("invalid_arguments", "记忆编号格式不正确"))
}
