//! Configuration file loading for tooloop
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLOOP_`-prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./tooloop.toml` or `./.tooloop.toml`
//! 4. Global: `~/.config/tooloop/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileExecutionConfig, FileLoggingConfig,
};
pub use loader::ConfigLoader;
