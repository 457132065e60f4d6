//! The conversation agent: history, memory injection, and the tool loop.

use crate::error::AgentError;
use crate::history::History;
use crate::prompt::build_system_prompt;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use kokoro_config::CompanionConfig;
use kokoro_llm::{ChatClient, ChatOptions};
use kokoro_memory::{MemoryRecord, MemoryStore};
use kokoro_protocol::{ChatMessage, ToolCallRequest};
use kokoro_tools::{Tool, ToolRegistry, builtin_memory_tools, relevant_memories};
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model round-trip bound for this run; config default applies if unset.
    pub max_recursions: Option<usize>,
    /// Provider stream flag, passed through to the chat client.
    pub stream: bool,
}

/// Result of one run: the final answer plus the last raw provider payload.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final assistant content; empty when the recursion bound was exhausted
    /// without any narrative content.
    pub content: String,
    /// Last raw provider response, for diagnostics.
    pub raw: Value,
}

/// Session-local, non-persistent memory log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMemoryEntry {
    /// Entry content.
    pub content: String,
    /// Entry timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Aggregated store statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    /// Count of valid records.
    pub count: usize,
    /// Valid record count per category wire name.
    pub categories: HashMap<String, usize>,
}

/// A character companion session: one conversation, one memory store.
///
/// `run` takes `&mut self`, so turns on one agent are serialized by
/// construction; share nothing across agents except the store handle.
pub struct Agent {
    config: CompanionConfig,
    store: Arc<dyn MemoryStore>,
    chat_client: Arc<dyn ChatClient>,
    tools: ToolRegistry,
    history: History,
    injected: Vec<MemoryRecord>,
    memory_log: Vec<SessionMemoryEntry>,
    builtins_registered: bool,
}

impl Agent {
    /// Create an agent over a store and chat client.
    pub fn new(
        config: CompanionConfig,
        store: Arc<dyn MemoryStore>,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        info!(
            "initializing agent (model={}, auto_inject={})",
            config.model, config.memory.auto_inject
        );
        Self {
            config,
            store,
            chat_client,
            tools: ToolRegistry::new(),
            history: History::new(),
            injected: Vec::new(),
            memory_log: Vec::new(),
            builtins_registered: false,
        }
    }

    /// Register a tool; a duplicate name keeps the first registration.
    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> bool {
        self.tools.register(tool)
    }

    /// Append a session-local memory log entry.
    pub fn add_memory(&mut self, content: impl Into<String>, timestamp: Option<DateTime<Utc>>) {
        self.memory_log.push(SessionMemoryEntry {
            content: content.into(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
        });
    }

    /// Read-only view of the conversation history.
    pub fn history(&self) -> &[ChatMessage] {
        self.history.entries()
    }

    /// Read-only view of the session memory log.
    pub fn memory_log(&self) -> &[SessionMemoryEntry] {
        &self.memory_log
    }

    /// Memories injected into the most recent turn.
    pub fn injected_memories(&self) -> &[MemoryRecord] {
        &self.injected
    }

    /// Aggregate store statistics per category.
    pub async fn memory_stats(&self) -> Result<MemoryStats, AgentError> {
        let count = self.store.get_count().await?;
        let categories = self
            .store
            .category_counts()
            .await?
            .into_iter()
            .map(|(category, count)| (category.as_str().to_string(), count))
            .collect();
        Ok(MemoryStats { count, categories })
    }

    /// Run one conversation turn.
    pub async fn run(&mut self, input: &str, options: RunOptions) -> Result<RunResult, AgentError> {
        self.ensure_builtin_tools();
        let max_recursions = options
            .max_recursions
            .unwrap_or(self.config.orchestrator.max_recursions);

        // trim before appending, so the limit bounds prior exchanges
        self.history
            .trim_to_exchanges(self.config.orchestrator.max_context_messages);
        self.history.push(ChatMessage::user(input.to_string()));

        self.injected = if self.config.memory.auto_inject {
            match relevant_memories(
                self.store.as_ref(),
                Some(self.chat_client.as_ref()),
                input,
                self.config.memory.inject_limit,
                None,
            )
            .await
            {
                Ok(records) => records,
                Err(err) => {
                    warn!("memory injection failed, continuing without it: {err}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let system_prompt = build_system_prompt(&self.config.persona, &self.injected);

        let mut final_content = String::new();
        let mut last_raw = Value::Null;
        let mut iterations = 0usize;
        while iterations < max_recursions {
            let mut messages = Vec::with_capacity(self.history.entries().len() + 1);
            messages.push(ChatMessage::system(system_prompt.clone()));
            messages.extend_from_slice(self.history.entries());

            let response = self
                .chat_client
                .send_chat(
                    &messages,
                    ChatOptions {
                        model: Some(self.config.model.clone()),
                        stream: options.stream,
                        tools: Some(self.tools.definitions()),
                    },
                )
                .await
                .map_err(|err| match err {
                    kokoro_llm::LlmError::Protocol(message) => AgentError::Protocol(message),
                    other => AgentError::Llm(other),
                })?;
            last_raw = response.raw;

            let content = response.content.unwrap_or_default();
            let has_content = !content.is_empty();
            let tool_calls = response.tool_calls;
            if !has_content && tool_calls.is_empty() {
                debug!("model returned neither content nor tool calls, ending turn");
                break;
            }

            if tool_calls.is_empty() {
                self.history.push(ChatMessage::assistant(content.clone()));
            } else {
                let calls = tool_calls
                    .into_iter()
                    .map(|call| ToolCallRequest {
                        id: Some(
                            call.id
                                .unwrap_or_else(|| synthesize_call_id(&call.name)),
                        ),
                        ..call
                    })
                    .collect::<Vec<_>>();
                let record_content = if has_content {
                    Some(content.clone())
                } else {
                    None
                };
                self.history
                    .push(ChatMessage::assistant_with_tool_calls(record_content, calls.clone()));

                debug!("executing tool calls (count={})", calls.len());
                let results = join_all(
                    calls
                        .iter()
                        .map(|call| execute_tool_call(&self.tools, call)),
                )
                .await;
                for (call, result) in calls.iter().zip(results) {
                    self.attribute_memory(&result);
                    let rendered = serde_json::to_string(&result)
                        .unwrap_or_else(|_| "{\"success\":false}".to_string());
                    let call_id = call.id.clone().unwrap_or_default();
                    self.history.push(ChatMessage::tool_result(call_id, rendered));
                }
            }

            if has_content {
                // narrative content exists; any tools were side effects
                final_content = content;
                break;
            }
            iterations += 1;
        }

        info!(
            "turn complete (iterations={}, content_len={})",
            iterations,
            final_content.len()
        );
        Ok(RunResult {
            content: final_content,
            raw: last_raw,
        })
    }

    /// Register built-in memory tools, never overriding caller tools.
    fn ensure_builtin_tools(&mut self) {
        if self.builtins_registered || !self.config.memory.register_builtin_tools {
            return;
        }
        for tool in builtin_memory_tools(self.store.clone()) {
            self.tools.register(tool);
        }
        self.builtins_registered = true;
    }

    /// Feed memory activity reported by a tool into the session log.
    fn attribute_memory(&mut self, result: &Value) {
        let success = result
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !success || result.get("memory_id").is_none() {
            return;
        }
        if let Some(message) = result.get("message").and_then(Value::as_str) {
            self.memory_log.push(SessionMemoryEntry {
                content: message.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Execute one tool call, converting every failure into a structured result.
async fn execute_tool_call(tools: &ToolRegistry, call: &ToolCallRequest) -> Value {
    let Some(tool) = tools.get(&call.name) else {
        warn!("model requested unknown tool (name={})", call.name);
        return json!({
            "success": false,
            "error": "unknown_tool",
            "message": format!("未知的工具:{}", call.name),
        });
    };

    // malformed argument JSON becomes a parse-error object the tool rejects
    let args = match serde_json::from_str::<Value>(&call.arguments) {
        Ok(value) if value.is_object() => value,
        Ok(value) => json!({
            "__parse_error": "arguments must be a JSON object",
            "raw": value,
        }),
        Err(err) => json!({
            "__parse_error": err.to_string(),
            "raw": call.arguments,
        }),
    };

    match tool.call(args).await {
        Ok(result) => result,
        Err(err) => {
            warn!("tool execution failed (name={}): {err}", call.name);
            json!({
                "success": false,
                "error": "execution_failed",
                "message": err.to_string(),
            })
        }
    }
}

/// Synthesize a call id for providers that omit one.
fn synthesize_call_id(name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::random();
    format!("call_{name}_{millis}_{suffix:04x}")
}
