//! Tool domain module
//!
//! Pure definitions for the tools a model may call, the requests it issues
//! and the outcomes of running them.
//!
//! ```text
//! ┌──────────────┐    ┌─────────────────┐    ┌──────────────┐
//! │ ToolSpec     │───▶│ ToolCallRequest │───▶│ ToolOutcome  │
//! │ (schemas)    │    │ (from the model)│    │ (to the log) │
//! └──────────────┘    └────────▲────────┘    └──────────────┘
//!                              │
//!                     StreamAccumulator
//!                     (ToolCallChunk*)
//! ```
//!
//! Execution lives in the application layer; this module has no I/O.

pub mod accumulator;
pub mod entities;
pub mod value_objects;

pub use accumulator::{AccumulatedTurn, StreamAccumulator, accumulate};
pub use entities::{ToolArguments, ToolCallRequest, ToolDefinition, ToolParameter, ToolSpec};
pub use value_objects::{ImageRef, ToolError, ToolOutcome};
