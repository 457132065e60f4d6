//! Registry for tool implementations.

use crate::tool::Tool;
use kokoro_protocol::ToolDefinition;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry for tool implementations.
///
/// The first registration of a name wins; later registrations under the
/// same name are ignored with a warning.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name; returns false when the name was taken.
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let mut tools = self.tools.write();
        if tools.contains_key(tool.name()) {
            warn!(
                "tool already registered, keeping first registration (name={})",
                tool.name()
            );
            return false;
        }
        debug!("registering tool (name={})", tool.name());
        tools.insert(tool.name().to_string(), tool);
        true
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// Return schema definitions for all registered tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .values()
            .map(|tool| tool.definition())
            .collect()
    }
}
