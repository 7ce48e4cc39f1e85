//! Application-level configuration.
//!
//! - [`ExecutionParams`]: loop control (tool turn cap, tool timeout, retries, streaming)

pub mod execution_params;

pub use execution_params::ExecutionParams;
