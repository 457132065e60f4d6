//! Shared mocks and helpers for kokoro tests.

mod llm;
mod memory;

pub use llm::{
    FailingChatClient, FixedChatClient, RecordingChatClient, ScriptedChatClient,
    text_response, tool_call_response,
};
pub use memory::temp_store;
