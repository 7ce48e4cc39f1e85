//! `[execution]` section

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tooloop_application::ExecutionParams;

/// Raw loop control settings from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    /// Tool-executing turns before the forced final call
    pub max_tool_turns: usize,
    /// Per-call tool timeout in seconds
    pub tool_timeout_seconds: Option<u64>,
    /// Extra runs while a typed function returns empty content
    pub retry_times: usize,
    /// Stream model turns
    pub stream: bool,
    /// Capacity of the chunk channel used by streaming model clients
    pub stream_buffer: usize,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            max_tool_turns: params.max_tool_turns,
            tool_timeout_seconds: None,
            retry_times: params.retry_times,
            stream: params.stream,
            stream_buffer: 64,
        }
    }
}

impl FileExecutionConfig {
    /// Convert to application-level [`ExecutionParams`].
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_max_tool_turns(self.max_tool_turns)
            .with_tool_timeout(self.tool_timeout_seconds.map(Duration::from_secs))
            .with_retry_times(self.retry_times)
            .with_stream(self.stream)
    }
}
