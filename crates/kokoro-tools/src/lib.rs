//! Memory tools, tool registry, and prompt helpers for kokoro.

pub mod builtins;
pub mod format;
pub mod registry;
pub mod relevant;
pub mod tool;

/// Built-in memory tools over a shared store.
pub use builtins::{
    CleanupMemoriesTool, ForgetMemoryTool, ListMemoriesTool, RecallMemoryTool, StoreMemoryTool,
    UpdateMemoryTool, builtin_memory_tools,
};
/// Prompt formatting for injected memories.
pub use format::format_memories;
/// Tool registry with first-registration-wins semantics.
pub use registry::ToolRegistry;
/// Relevance-candidate selection helper.
pub use relevant::relevant_memories;
/// Tool trait.
pub use tool::Tool;
