//! Chat-completion client adapter for kokoro.

pub mod client;
pub mod error;
pub mod openai;

/// Chat client trait and request/response types.
pub use client::{ChatClient, ChatOptions, ChatResponse};
/// Chat client error type.
pub use error::LlmError;
/// OpenAI-compatible HTTP implementation.
pub use openai::OpenAiChatClient;
