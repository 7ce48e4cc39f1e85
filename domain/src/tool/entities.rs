//! Tool domain entities

use super::value_objects::ToolError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyword arguments handed to a capability, parsed from the model's JSON.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// Definition of a tool the model may request by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "get_weather")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// JSON type hint ("string", "integer", "number", "boolean", "array", "object")
    pub param_type: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

/// Declared tool schemas, keyed and iterated by tool name
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.insert(tool);
        self
    }

    /// Insert a definition, replacing any previous one with the same name
    pub fn insert(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// All definitions, sorted by name
    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// A complete tool call issued by the model.
///
/// Produced whole by the model client in non-streaming mode, or assembled
/// from [`ToolCallChunk`](crate::session::stream::ToolCallChunk)s by the
/// [`StreamAccumulator`](super::accumulator::StreamAccumulator). Immutable
/// once complete; `arguments` is kept as the raw JSON text the model sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned id, echoed back on the tool reply
    pub id: String,
    /// Name of the requested tool
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the raw arguments into a keyword map.
    ///
    /// Blank arguments are read as an empty map. Anything that is not a JSON
    /// object is rejected with `INVALID_ARGUMENT`.
    pub fn parse_arguments(&self) -> Result<ToolArguments, ToolError> {
        if self.arguments.trim().is_empty() {
            return Ok(ToolArguments::new());
        }
        match serde_json::from_str::<serde_json::Value>(&self.arguments) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(ToolError::invalid_argument(format!(
                "arguments for '{}' must be a JSON object, got {}",
                self.name,
                json_kind(&other)
            ))),
            Err(e) => Err(ToolError::invalid_argument(format!(
                "arguments for '{}' are not valid JSON: {}",
                self.name, e
            ))
            .with_details(self.arguments.clone())),
        }
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
