//! Infrastructure layer for tooloop
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod providers;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileExecutionConfig, FileLoggingConfig,
};
pub use logging::JsonlConversationLogger;
pub use providers::{ReplayError, ReplayModelClient};
pub use tools::{JsonSchemaToolConverter, builtin_registry, register_builtins};
