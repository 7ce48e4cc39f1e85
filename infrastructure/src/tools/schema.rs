//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing the function-tool
//! format accepted by OpenAI-compatible chat APIs.

use serde_json::{Map, Value, json};
use tooloop_application::ToolSchemaPort;
use tooloop_domain::ToolDefinition;

/// Converts [`ToolDefinition`]s into `{"type": "function", "function": {...}}`.
///
/// Handles param_type → JSON Schema type mapping:
/// - `"string"`, `"path"` → `"string"`
/// - `"number"`, `"float"` → `"number"`
/// - `"integer"` → `"integer"`
/// - `"boolean"` → `"boolean"`
/// - `"array"`, `"object"` → unchanged
/// - anything else → `"string"`
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    fn json_type(param_type: &str) -> &'static str {
        match param_type {
            "number" | "float" => "number",
            "integer" => "integer",
            "boolean" => "boolean",
            "array" => "array",
            "object" => "object",
            _ => "string",
        }
    }
}

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &tool.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": Self::json_type(&param.param_type),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooloop_domain::{ToolParameter, ToolSpec};

    #[test]
    fn test_tool_to_schema() {
        let converter = JsonSchemaToolConverter;
        let tool = ToolDefinition::new("get_weather", "Current weather for a city")
            .with_parameter(ToolParameter::new("city", "City name", true))
            .with_parameter(ToolParameter::new("days", "Forecast days", false).with_type("integer"))
            .with_parameter(ToolParameter::new("units", "Units", false).with_type("unit"));

        let schema = converter.tool_to_schema(&tool);
        assert_eq!(schema["type"], "function");

        let function = &schema["function"];
        assert_eq!(function["name"], "get_weather");
        assert_eq!(function["description"], "Current weather for a city");
        assert_eq!(function["parameters"]["type"], "object");

        let properties = &function["parameters"]["properties"];
        assert_eq!(properties["city"]["type"], "string");
        assert_eq!(properties["city"]["description"], "City name");
        assert_eq!(properties["days"]["type"], "integer");
        // Unknown type hints fall back to string
        assert_eq!(properties["units"]["type"], "string");

        assert_eq!(function["parameters"]["required"], json!(["city"]));
    }

    #[test]
    fn test_parameter_order_is_preserved() {
        let tool = ToolDefinition::new("f", "F")
            .with_parameter(ToolParameter::new("zeta", "z", true))
            .with_parameter(ToolParameter::new("alpha", "a", true));
        let schema = JsonSchemaToolConverter.tool_to_schema(&tool);
        let keys: Vec<_> = schema["function"]["parameters"]["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_all_tools_schema_sorted_by_name() {
        let spec = ToolSpec::new()
            .register(ToolDefinition::new("search", "Search"))
            .register(ToolDefinition::new("echo", "Echo"));

        let tools = JsonSchemaToolConverter.all_tools_schema(&spec);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["function"]["name"], "echo");
        assert_eq!(tools[1]["function"]["name"], "search");
        for tool in &tools {
            assert_eq!(tool["function"]["parameters"]["required"], json!([]));
        }
    }
}
