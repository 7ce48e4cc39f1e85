//! Domain layer for tooloop
//!
//! Pure types and algorithms for driving a tool-calling language model. No
//! I/O lives here; the application layer adds the model client, the
//! capability registry and the orchestration loop on top.
//!
//! # Core Concepts
//!
//! ## Transcript
//!
//! The ordered message log of one run. Append-only, and a `Tool` reply is
//! only accepted for a call id an earlier assistant message requested.
//!
//! ## Tool calls
//!
//! - [`ToolCallRequest`]: a complete call issued by the model
//! - [`StreamAccumulator`]: rebuilds calls from streamed [`ToolCallChunk`]s
//! - [`ToolOutcome`]: plain value, caption plus image, or error
//!
//! ## Typed codec
//!
//! A [`TypeDescriptor`] describes the shape expected back from the model.
//! It produces a schema and an example for the prompt, and decodes the reply.

pub mod codec;
pub mod core;
pub mod prompt;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use codec::{
    DecodeError, DecodeErrorKind, Described, FieldDescriptor, PrimitiveKind, RecordType,
    TypeDescriptor, decode, decode_as, describe_schema, describe_type, example_for,
};
pub use core::error::DomainError;
pub use prompt::{FunctionArgument, FunctionPrompt};
pub use session::{
    ContentBlock, ContentPart, LlmResponse, LoopState, Message, MessageContent, Role, StopReason,
    StreamChunk, ToolCallChunk, Transcript,
};
pub use tool::{
    AccumulatedTurn, ImageRef, StreamAccumulator, ToolArguments, ToolCallRequest, ToolDefinition,
    ToolError, ToolOutcome, ToolParameter, ToolSpec, accumulate,
};
