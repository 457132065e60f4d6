//! Role-tagged chat messages and model-issued tool-call requests.

use serde::{Deserialize, Serialize};

/// Speaker role for a conversation entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-authored instructions.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
    /// Tool result fed back to the model.
    Tool,
}

impl MessageRole {
    /// Return the role as a lowercase wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }

    /// Parse a role from a lowercase wire string; unknown values map to user.
    pub fn parse(value: &str) -> Self {
        match value {
            "system" => MessageRole::System,
            "assistant" => MessageRole::Assistant,
            "tool" => MessageRole::Tool,
            _ => MessageRole::User,
        }
    }
}

/// A tool invocation requested by the model.
///
/// `arguments` is the raw JSON-encoded string as produced by the provider;
/// parsing (and parse-failure capture) happens at the orchestrator boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Provider-assigned call id; absent with some providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded argument string.
    pub arguments: String,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role that produced the message.
    pub role: MessageRole,
    /// Textual content; empty for pure tool-call turns.
    pub content: String,
    /// Optional participant name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Back-reference to the originating tool call, for tool messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls issued by the assistant, for assistant messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message carrying tool-call requests.
    pub fn assistant_with_tool_calls(
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.unwrap_or_default(),
            name: None,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result message correlated to a tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            name: None,
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of the message.
    Stop,
    /// The model requested tool calls.
    ToolCalls,
    /// Token budget exhausted.
    Length,
    /// Anything the adapter does not recognize.
    Other(String),
}

impl FinishReason {
    /// Parse a provider finish-reason string.
    pub fn parse(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, FinishReason, MessageRole, ToolCallRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(MessageRole::parse("system"), MessageRole::System);
        assert_eq!(MessageRole::parse("tool"), MessageRole::Tool);
        assert_eq!(MessageRole::parse("unknown"), MessageRole::User);
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn assistant_with_tool_calls_defaults_content() {
        let call = ToolCallRequest {
            id: Some("call_1".to_string()),
            name: "store_memory".to_string(),
            arguments: "{}".to_string(),
        };
        let message = ChatMessage::assistant_with_tool_calls(None, vec![call.clone()]);
        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls, Some(vec![call]));
    }

    #[test]
    fn tool_result_carries_call_id() {
        let message = ChatMessage::tool_result("call_9", "done");
        assert_eq!(message.role, MessageRole::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn finish_reason_parses_known_values() {
        assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(
            FinishReason::parse("content_filter"),
            FinishReason::Other("content_filter".to_string())
        );
    }
}
