//! OpenAI-compatible chat-completion client.

use crate::client::{ChatClient, ChatOptions, ChatResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use kokoro_protocol::{ChatMessage, FinishReason, ToolCallRequest};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat client for OpenAI-compatible `/chat/completions` endpoints.
///
/// Not responsible for retries, backoff, or stream reassembly; the stream
/// flag is passed through to the provider as-is.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl OpenAiChatClient {
    /// Create a client for the given endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            default_model: default_model.into(),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LlmError::MissingApiKey);
        };
        let model = options.model.as_deref().unwrap_or(&self.default_model);
        let request = build_request(model, messages, &options);
        debug!(
            "sending chat completion (model={}, messages={}, tools={})",
            model,
            messages.len(),
            options.tools.as_ref().map(Vec::len).unwrap_or(0)
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let raw: Value = response.json().await?;
        parse_response(raw)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Some providers expect snake_case, others camelCase; tool messages
    /// carry both spellings for maximum compatibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(rename = "toolCallId", skip_serializing_if = "Option::is_none")]
    tool_call_id_camel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Serialize)]
struct WireToolCall {
    id: String,
    r#type: &'static str,
    function: WireFunctionCall,
}

#[derive(Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireToolFunction,
}

#[derive(Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// Translate internal messages and tool schemas into the provider shape.
fn build_request<'a>(
    model: &'a str,
    messages: &[ChatMessage],
    options: &ChatOptions,
) -> WireRequest<'a> {
    let messages = messages
        .iter()
        .map(|message| {
            let tool_calls = message.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone().unwrap_or_default(),
                        r#type: "function",
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect::<Vec<_>>()
            });
            // assistant tool-call turns send null content, not ""
            let content = if tool_calls.is_some() && message.content.is_empty() {
                None
            } else {
                Some(message.content.clone())
            };
            WireMessage {
                role: message.role.as_str(),
                content,
                name: message.name.clone(),
                tool_call_id: message.tool_call_id.clone(),
                tool_call_id_camel: message.tool_call_id.clone(),
                tool_calls,
            }
        })
        .collect();

    let tools = options.tools.as_ref().map(|tools| {
        tools
            .iter()
            .map(|definition| WireTool {
                r#type: "function",
                function: WireToolFunction {
                    name: definition.name.clone(),
                    description: definition.description.clone(),
                    parameters: definition.parameters_schema(),
                },
            })
            .collect::<Vec<_>>()
    });

    WireRequest {
        model,
        messages,
        stream: options.stream,
        tools,
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: Option<WireResponseMessage>,
    #[serde(default, alias = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "toolCalls")]
    tool_calls: Option<Vec<WireResponseToolCall>>,
}

#[derive(Deserialize)]
struct WireResponseToolCall {
    #[serde(default, alias = "toolCallId")]
    id: Option<String>,
    function: WireResponseFunction,
}

#[derive(Deserialize)]
struct WireResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Normalize a raw provider payload into a [`ChatResponse`].
fn parse_response(raw: Value) -> Result<ChatResponse, LlmError> {
    let parsed: WireResponse = serde_json::from_value(raw.clone())?;
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Err(LlmError::Protocol(
            "response contained no choices".to_string(),
        ));
    };
    let Some(message) = choice.message else {
        return Err(LlmError::Protocol(
            "response contained no assistant message".to_string(),
        ));
    };

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect::<Vec<_>>();
    let content = message.content.filter(|content| !content.is_empty());
    let finish_reason = match choice.finish_reason.as_deref() {
        Some(reason) => FinishReason::parse(reason),
        None if tool_calls.is_empty() => FinishReason::Stop,
        None => FinishReason::ToolCalls,
    };

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason,
        raw,
    })
}
