//! Mock chat clients.

use async_trait::async_trait;
use kokoro_llm::{ChatClient, ChatOptions, ChatResponse, LlmError};
use kokoro_protocol::{ChatMessage, FinishReason, ToolCallRequest};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;

/// Build a plain text response.
pub fn text_response(content: impl Into<String>) -> ChatResponse {
    ChatResponse {
        content: Some(content.into()),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Stop,
        raw: json!({ "mock": true }),
    }
}

/// Build a tool-call-only response with empty content.
pub fn tool_call_response(calls: Vec<(&str, &str)>) -> ChatResponse {
    ChatResponse {
        content: None,
        tool_calls: calls
            .into_iter()
            .map(|(name, arguments)| ToolCallRequest {
                id: None,
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
        finish_reason: FinishReason::ToolCalls,
        raw: json!({ "mock": true }),
    }
}

/// Chat client that always returns the same text.
#[derive(Debug, Clone)]
pub struct FixedChatClient {
    content: String,
}

impl FixedChatClient {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl ChatClient for FixedChatClient {
    async fn send_chat(
        &self,
        _messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        Ok(text_response(self.content.clone()))
    }
}

/// Chat client that replays a queue of canned responses.
///
/// Once the queue drains, further calls return an empty response with
/// neither content nor tool calls. Tracks how many calls were issued.
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<ChatResponse>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of chat calls issued so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn send_chat(
        &self,
        _messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        *self.calls.lock() += 1;
        Ok(self.responses.lock().pop_front().unwrap_or(ChatResponse {
            content: None,
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            raw: json!({ "mock": "drained" }),
        }))
    }
}

/// Chat client that records the outbound request and returns fixed text.
pub struct RecordingChatClient {
    content: String,
    /// Messages from the most recent call.
    pub last_messages: Arc<Mutex<Vec<ChatMessage>>>,
    /// Tool names offered on the most recent call.
    pub seen_tools: Arc<Mutex<Vec<String>>>,
}

impl RecordingChatClient {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            last_messages: Arc::new(Mutex::new(Vec::new())),
            seen_tools: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        *self.last_messages.lock() = messages.to_vec();
        *self.seen_tools.lock() = options
            .tools
            .unwrap_or_default()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        Ok(text_response(self.content.clone()))
    }
}

/// Chat client that always fails.
#[derive(Debug, Clone)]
pub struct FailingChatClient {
    message: String,
}

impl FailingChatClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatClient for FailingChatClient {
    async fn send_chat(
        &self,
        _messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        Err(LlmError::Protocol(self.message.clone()))
    }
}
