//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application types.

mod execution;
mod logging;

pub use execution::FileExecutionConfig;
pub use logging::FileLoggingConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("execution.max_tool_turns cannot be 0")]
    InvalidMaxToolTurns,

    #[error("execution.tool_timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("execution.stream_buffer cannot be 0")]
    InvalidStreamBuffer,
}

/// Complete file configuration (raw TOML structure)
///
/// ```toml
/// [execution]
/// max_tool_turns = 5
/// tool_timeout_seconds = 30
/// retry_times = 2
/// stream = false
/// stream_buffer = 64
///
/// [logging]
/// conversation_log = "run.conversation.jsonl"
/// log_file = "tooloop.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Loop control
    pub execution: FileExecutionConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        if self.execution.max_tool_turns == 0 {
            issues.push(ConfigValidationError::InvalidMaxToolTurns);
        }
        if self.execution.tool_timeout_seconds == Some(0) {
            issues.push(ConfigValidationError::InvalidTimeout);
        }
        if self.execution.stream_buffer == 0 {
            issues.push(ConfigValidationError::InvalidStreamBuffer);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[execution]
max_tool_turns = 3
tool_timeout_seconds = 10
retry_times = 0
stream = true
stream_buffer = 8

[logging]
conversation_log = "logs/run.jsonl"
log_file = "logs/tooloop.log"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.execution.max_tool_turns, 3);
        assert_eq!(config.execution.tool_timeout_seconds, Some(10));
        assert_eq!(config.execution.retry_times, 0);
        assert!(config.execution.stream);
        assert_eq!(config.execution.stream_buffer, 8);
        assert_eq!(
            config.logging.conversation_log,
            Some(PathBuf::from("logs/run.jsonl"))
        );
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[execution]
stream = true
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.execution.stream);
        // Defaults should apply
        assert_eq!(config.execution.max_tool_turns, 5);
        assert_eq!(config.execution.retry_times, 2);
        assert!(config.logging.log_file.is_none());
    }

    #[test]
    fn test_validate_reports_all_issues() {
        let toml_str = r#"
[execution]
max_tool_turns = 0
tool_timeout_seconds = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            vec![
                ConfigValidationError::InvalidMaxToolTurns,
                ConfigValidationError::InvalidTimeout
            ]
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(FileConfig::default().validate().is_empty());
    }
}
