//! Tool schema conversion port.
//!
//! Separates "which tools exist" (domain [`ToolSpec`]) from "how they are
//! serialized for the model API" (infrastructure).

use tooloop_domain::{ToolDefinition, ToolSpec};

/// Port for converting tool definitions to the model API's JSON format.
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single tool definition.
    fn tool_to_schema(&self, tool: &ToolDefinition) -> serde_json::Value;

    /// Convert all tools, sorted by name.
    fn all_tools_schema(&self, spec: &ToolSpec) -> Vec<serde_json::Value> {
        spec.all().map(|tool| self.tool_to_schema(tool)).collect()
    }
}
