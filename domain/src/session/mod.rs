//! Conversation domain: messages, the transcript, model responses and
//! streamed chunks.

pub mod entities;
pub mod loop_state;
pub mod response;
pub mod stream;
pub mod transcript;

pub use entities::{ContentPart, Message, MessageContent, Role};
pub use loop_state::LoopState;
pub use response::{ContentBlock, LlmResponse, StopReason};
pub use stream::{StreamChunk, ToolCallChunk};
pub use transcript::Transcript;
