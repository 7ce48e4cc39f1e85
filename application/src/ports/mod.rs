//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod capability;
pub mod conversation_logger;
pub mod llm_gateway;
pub mod observer;
pub mod tool_schema;
