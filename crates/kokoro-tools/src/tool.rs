//! Tool trait definition.

use async_trait::async_trait;
use kokoro_protocol::{ToolDefinition, ToolError};
use serde_json::Value;

/// Interface for executable tools.
///
/// A tool is registered once per session, looked up by name during
/// execution, and invoked with untyped JSON arguments which it validates
/// against its own declared schema before doing any work.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Return the tool name.
    fn name(&self) -> &str;

    /// Return the tool description.
    fn description(&self) -> &str;

    /// Declared argument schema for this tool.
    fn definition(&self) -> ToolDefinition;

    /// Invoke the tool with JSON arguments.
    ///
    /// Expected failures (validation, unknown ids) come back as structured
    /// `{"success": false, ...}` values; `Err` is reserved for unexpected
    /// execution failures such as an unavailable store.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}
