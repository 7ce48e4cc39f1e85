//! Use cases
//!
//! Application-level operations that orchestrate domain logic.
//!
//! - [`execute_tools`]: run one turn's tool calls concurrently
//! - [`run_tool_loop`]: the model/tool turn loop
//! - [`run_function`]: typed functions on top of the loop

pub mod execute_tools;
pub mod run_function;
pub mod run_tool_loop;
