//! Tool schema descriptors and tool error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Free-form text.
    String,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Number,
    /// True/false flag.
    Boolean,
}

impl ParameterKind {
    /// JSON-schema type name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
        }
    }
}

/// A single named tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameter {
    /// Parameter name.
    pub name: String,
    /// Semantic type.
    pub kind: ParameterKind,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Optional closed set of accepted values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Whether the parameter must be present.
    pub required: bool,
}

impl ToolParameter {
    /// Create a required parameter.
    pub fn required(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            enum_values: None,
            required: true,
        }
    }

    /// Create an optional parameter.
    pub fn optional(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            enum_values: None,
            required: false,
        }
    }

    /// Restrict the parameter to a closed set of values.
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Declared shape of a tool: name, description, and parameter schema.
///
/// Registered once per session and looked up by name during execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name as issued by the model.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Named parameters.
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    /// Render the parameters as an object-typed JSON schema.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for parameter in &self.parameters {
            let mut property = serde_json::Map::new();
            property.insert("type".to_string(), json!(parameter.kind.as_str()));
            property.insert("description".to_string(), json!(parameter.description));
            if let Some(values) = &parameter.enum_values {
                property.insert("enum".to_string(), json!(values));
            }
            properties.insert(parameter.name.clone(), Value::Object(property));
            if parameter.required {
                required.push(parameter.name.clone());
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Errors returned by tools and the tool dispatch layer.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in the registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Tool received invalid or missing arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Tool execution failed unexpectedly.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
