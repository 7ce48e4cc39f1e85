//! `[logging]` section

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw log destinations from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL conversation log
    pub conversation_log: Option<PathBuf>,
    /// Diagnostic log file, in addition to stderr
    pub log_file: Option<PathBuf>,
}
