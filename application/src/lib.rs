//! Application layer for tooloop
//!
//! This crate contains use cases, port definitions, the capability registry
//! and loop configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    capability::{Capability, FnCapability},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway, StreamHandle},
    observer::{ChannelObserver, NoRunObserver, RunEvent, RunObserver},
    tool_schema::ToolSchemaPort,
};
pub use registry::CapabilityRegistry;
pub use use_cases::execute_tools::{ConcurrentToolExecutor, ToolBatchOutput};
pub use use_cases::run_function::{
    RunFunctionError, RunFunctionInput, RunFunctionOutput, RunFunctionUseCase,
};
pub use use_cases::run_tool_loop::{
    FinalMessage, RunToolLoopError, RunToolLoopInput, RunToolLoopUseCase,
};
