//! Prompt domain
//!
//! Builds the initial conversation for a typed function call: a system
//! prompt describing the task and the expected return shape, and a user
//! prompt listing the argument values.

mod template;

pub use template::{FunctionArgument, FunctionPrompt};
