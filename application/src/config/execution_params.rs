//! Execution parameters: orchestration loop control.
//!
//! [`ExecutionParams`] groups the static parameters that control
//! [`RunToolLoopUseCase`](crate::use_cases::run_tool_loop::RunToolLoopUseCase)
//! and [`RunFunctionUseCase`](crate::use_cases::run_function::RunFunctionUseCase).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop control parameters.
///
/// | Field | Used by | Default |
/// |-------|---------|---------|
/// | `max_tool_turns` | tool loop: turns before the forced final call | 5 |
/// | `tool_timeout` | tool executor: per-call limit | none |
/// | `retry_times` | typed functions: extra runs while content is empty | 2 |
/// | `stream` | tool loop: use `chat_stream` for tool-enabled turns | false |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum tool-executing turns before tools are withheld.
    pub max_tool_turns: usize,
    /// Timeout applied to each tool invocation.
    pub tool_timeout: Option<Duration>,
    /// Additional attempts when the final content is empty.
    pub retry_times: usize,
    /// Stream model turns instead of single-shot calls.
    pub stream: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_tool_turns: 5,
            tool_timeout: None,
            retry_times: 2,
            stream: false,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_tool_turns(mut self, max: usize) -> Self {
        self.max_tool_turns = max;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_retry_times(mut self, retries: usize) -> Self {
        self.retry_times = retries;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
