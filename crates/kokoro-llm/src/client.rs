//! Chat client trait and normalized request/response types.

use crate::error::LlmError;
use async_trait::async_trait;
use kokoro_protocol::{ChatMessage, FinishReason, ToolCallRequest, ToolDefinition};

/// Per-call options for a chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Model override; the client default applies when absent.
    pub model: Option<String>,
    /// Provider stream flag, passed through verbatim.
    pub stream: bool,
    /// Tool schemas offered to the model.
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Normalized provider response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant text content, if any.
    pub content: Option<String>,
    /// Tool-call requests, if any.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Provider finish reason.
    pub finish_reason: FinishReason,
    /// Raw provider payload for diagnostics.
    pub raw: serde_json::Value,
}

/// Narrow RPC boundary to an external chat-completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send role-tagged messages (plus optional tool schemas) and return the
    /// normalized assistant response.
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError>;
}
