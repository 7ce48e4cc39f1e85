//! Tool implementations and schema conversion
//!
//! - `builtin`: tools registered by default (echo, current_time, read_file, show_image)
//! - `schema`: [`ToolDefinition`](tooloop_domain::ToolDefinition) → function-tool JSON

pub mod builtin;
mod schema;

pub use builtin::{builtin_registry, register_builtins};
pub use schema::JsonSchemaToolConverter;
