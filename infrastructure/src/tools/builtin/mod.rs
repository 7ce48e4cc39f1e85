//! Built-in capabilities
//!
//! Small tools available to every run: `echo`, `current_time`, `read_file`
//! and `show_image`. Each tool has a `*_definition()` function and an async
//! `execute_*` function taking the parsed arguments.

use chrono::{SecondsFormat, Utc};
use std::path::Path;
use tooloop_application::CapabilityRegistry;
use tooloop_domain::{ImageRef, ToolArguments, ToolDefinition, ToolError, ToolOutcome, ToolParameter};

/// Tool name constants
pub const ECHO: &str = "echo";
pub const CURRENT_TIME: &str = "current_time";
pub const READ_FILE: &str = "read_file";
pub const SHOW_IMAGE: &str = "show_image";

/// Maximum file size to read (1 MB)
const MAX_READ_SIZE: u64 = 1024 * 1024;

/// Registry holding every built-in tool.
pub fn builtin_registry() -> CapabilityRegistry {
    register_builtins(CapabilityRegistry::new())
}

/// Add the built-in tools to an existing registry.
pub fn register_builtins(registry: CapabilityRegistry) -> CapabilityRegistry {
    registry
        .register_fn(echo_definition(), execute_echo)
        .register_fn(current_time_definition(), execute_current_time)
        .register_fn(read_file_definition(), execute_read_file)
        .register_fn(show_image_definition(), execute_show_image)
}

fn require_str<'a>(args: &'a ToolArguments, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid_argument(format!("missing string argument '{}'", key)))
}

// ==================== echo ====================

pub fn echo_definition() -> ToolDefinition {
    ToolDefinition::new(ECHO, "Return the given text unchanged")
        .with_parameter(ToolParameter::new("text", "Text to return", true))
}

pub async fn execute_echo(args: ToolArguments) -> Result<ToolOutcome, ToolError> {
    Ok(ToolOutcome::text(require_str(&args, "text")?))
}

// ==================== current_time ====================

pub fn current_time_definition() -> ToolDefinition {
    ToolDefinition::new(CURRENT_TIME, "Current UTC date and time").with_parameter(
        ToolParameter::new(
            "format",
            "strftime format string; RFC 3339 when omitted",
            false,
        ),
    )
}

pub async fn execute_current_time(args: ToolArguments) -> Result<ToolOutcome, ToolError> {
    let now = Utc::now();
    let text = match args.get("format").and_then(|v| v.as_str()) {
        Some(format) => {
            use std::fmt::Write;
            let mut out = String::new();
            // Invalid specifiers make chrono's Display fail
            write!(out, "{}", now.format(format)).map_err(|_| {
                ToolError::invalid_argument(format!("invalid time format '{}'", format))
            })?;
            out
        }
        None => now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    Ok(ToolOutcome::text(text))
}

// ==================== read_file ====================

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(READ_FILE, "Read a UTF-8 text file")
        .with_parameter(ToolParameter::new("path", "Path to the file to read", true).with_type("path"))
        .with_parameter(
            ToolParameter::new("offset", "Line number to start from (0-indexed)", false)
                .with_type("integer"),
        )
        .with_parameter(
            ToolParameter::new("limit", "Maximum number of lines to return", false)
                .with_type("integer"),
        )
}

pub async fn execute_read_file(args: ToolArguments) -> Result<ToolOutcome, ToolError> {
    let path_str = require_str(&args, "path")?;
    let path = Path::new(path_str);

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| ToolError::new("NOT_FOUND", format!("File '{}' does not exist", path_str)))?;
    if !metadata.is_file() {
        return Err(ToolError::invalid_argument(format!(
            "'{}' is not a file",
            path_str
        )));
    }
    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolError::invalid_argument(format!(
            "File too large ({} bytes). Maximum size is {} bytes",
            metadata.len(),
            MAX_READ_SIZE
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ToolError::execution_failed(format!("Failed to read file: {}", e)))?;

    let offset = args.get("offset").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let limit = args.get("limit").and_then(|v| v.as_u64()).map(|n| n as usize);
    let lines = content.lines().skip(offset);
    let selected: Vec<&str> = match limit {
        Some(limit) => lines.take(limit).collect(),
        None => lines.collect(),
    };
    Ok(ToolOutcome::text(selected.join("\n")))
}

// ==================== show_image ====================

pub fn show_image_definition() -> ToolDefinition {
    ToolDefinition::new(SHOW_IMAGE, "Attach an image by URL so it can be looked at")
        .with_parameter(ToolParameter::new("url", "Image URL", true))
        .with_parameter(ToolParameter::new("caption", "Short caption", false))
}

pub async fn execute_show_image(args: ToolArguments) -> Result<ToolOutcome, ToolError> {
    let url = require_str(&args, "url")?;
    if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:")) {
        return Err(ToolError::invalid_argument(format!(
            "'{}' is not an http(s) or data URL",
            url
        )));
    }
    let caption = args
        .get("caption")
        .and_then(|v| v.as_str())
        .unwrap_or("Image")
        .to_string();
    Ok(ToolOutcome::multimodal(caption, ImageRef::url(url)))
}
