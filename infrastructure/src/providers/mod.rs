//! Model client adapters implementing the [`LlmGateway`](tooloop_application::LlmGateway) port.

pub mod replay;

pub use replay::{DEFAULT_STREAM_BUFFER, ReplayError, ReplayModelClient};
