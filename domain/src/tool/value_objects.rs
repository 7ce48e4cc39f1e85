//! Tool domain value objects: outcomes and errors of a tool invocation
//!
//! Every invocation resolves to a [`ToolOutcome`]. Failures never escape as
//! Rust errors past the executor: unknown tools, malformed arguments, capability
//! errors, timeouts and panics all become [`ToolOutcome::Error`], which the
//! executor writes into the transcript so the model can react on its next turn.

use crate::session::entities::ContentPart;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error that occurred while resolving or invoking a tool.
///
/// | Code | Raised when |
/// |------|-------------|
/// | `NOT_FOUND` | The model asked for a tool that is not registered |
/// | `INVALID_ARGUMENT` | Arguments are not a JSON object, or a capability rejects them |
/// | `EXECUTION_FAILED` | The capability failed or panicked |
/// | `TIMEOUT` | The per-call timeout elapsed |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "TIMEOUT")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Tool '{}' is not registered", tool_name.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(tool_name: impl Into<String>, after_ms: u128) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Tool '{}' timed out after {}ms", tool_name.into(), after_ms),
        )
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Reference to an image returned by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    /// Image reachable by URL.
    Url {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Inline image bytes, already base64-encoded.
    Data {
        mime_type: String,
        base64: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl ImageRef {
    pub fn url(url: impl Into<String>) -> Self {
        ImageRef::Url {
            url: url.into(),
            detail: None,
        }
    }

    pub fn data(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        ImageRef::Data {
            mime_type: mime_type.into(),
            base64: base64.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, level: impl Into<String>) -> Self {
        match &mut self {
            ImageRef::Url { detail, .. } | ImageRef::Data { detail, .. } => {
                *detail = Some(level.into())
            }
        }
        self
    }

    /// URL form of the image; inline data becomes a `data:` URL.
    pub fn to_url(&self) -> String {
        match self {
            ImageRef::Url { url, .. } => url.clone(),
            ImageRef::Data {
                mime_type, base64, ..
            } => format!("data:{};base64,{}", mime_type, base64),
        }
    }

    /// Content block carrying this image inside a message.
    pub fn to_content_part(&self) -> ContentPart {
        match self {
            ImageRef::Url { url, detail } => ContentPart::ImageUrl {
                url: url.clone(),
                detail: detail.clone(),
            },
            ImageRef::Data {
                mime_type,
                base64,
                detail,
            } => ContentPart::ImageData {
                mime_type: mime_type.clone(),
                data: base64.clone(),
                detail: detail.clone(),
            },
        }
    }
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// A JSON value, written to the transcript as a `Tool` reply.
    Plain(serde_json::Value),
    /// A caption plus an image, written as an assistant/user message pair.
    Multimodal { caption: String, image: ImageRef },
    /// A failure, written as `{"error": message}`.
    Error(String),
}

impl ToolOutcome {
    /// Wrap any serializable value.
    ///
    /// Values that serde cannot turn into JSON (maps with non-string keys,
    /// failing `Serialize` impls) are stored as their `Debug` text instead.
    pub fn plain<T: Serialize + fmt::Debug>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => ToolOutcome::Plain(v),
            Err(_) => ToolOutcome::Plain(serde_json::Value::String(format!("{:?}", value))),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ToolOutcome::Plain(serde_json::Value::String(text.into()))
    }

    pub fn multimodal(caption: impl Into<String>, image: ImageRef) -> Self {
        ToolOutcome::Multimodal {
            caption: caption.into(),
            image,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolOutcome::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }

    pub fn is_multimodal(&self) -> bool {
        matches!(self, ToolOutcome::Multimodal { .. })
    }

    /// Text written to a `Tool`-role reply for non-multimodal outcomes.
    pub fn reply_content(&self) -> String {
        match self {
            ToolOutcome::Plain(value) => value.to_string(),
            ToolOutcome::Error(message) => serde_json::json!({ "error": message }).to_string(),
            ToolOutcome::Multimodal { caption, image } => serde_json::json!({
                "caption": caption,
                "image": image.to_url(),
            })
            .to_string(),
        }
    }
}

impl From<ToolError> for ToolOutcome {
    fn from(err: ToolError) -> Self {
        ToolOutcome::Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::not_found("get_weather").with_details("available: search");
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(
            err.to_string(),
            "[NOT_FOUND] Tool 'get_weather' is not registered (available: search)"
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = ToolError::timeout("slow", 250);
        assert_eq!(err.code, "TIMEOUT");
        assert!(err.message.contains("250ms"));
    }

    #[test]
    fn test_plain_reply_is_json() {
        let outcome = ToolOutcome::text("sunny");
        assert_eq!(outcome.reply_content(), "\"sunny\"");

        let outcome = ToolOutcome::plain(&serde_json::json!({"temp": 21}));
        assert_eq!(outcome.reply_content(), r#"{"temp":21}"#);
    }

    #[test]
    fn test_unserializable_value_is_stringified() {
        let mut map: HashMap<(i32, i32), &str> = HashMap::new();
        map.insert((1, 2), "x");
        let outcome = ToolOutcome::plain(&map);
        match outcome {
            ToolOutcome::Plain(serde_json::Value::String(s)) => assert!(s.contains("(1, 2)")),
            other => panic!("expected stringified value, got {:?}", other),
        }
    }

    #[test]
    fn test_error_reply_shape() {
        let outcome = ToolOutcome::error("boom");
        let parsed: serde_json::Value = serde_json::from_str(&outcome.reply_content()).unwrap();
        assert_eq!(parsed, serde_json::json!({"error": "boom"}));
        assert!(outcome.is_error());
    }

    #[test]
    fn test_from_tool_error() {
        let outcome: ToolOutcome = ToolError::invalid_argument("bad city").into();
        assert_eq!(
            outcome,
            ToolOutcome::Error("[INVALID_ARGUMENT] bad city".to_string())
        );
    }

    #[test]
    fn test_image_data_url() {
        let image = ImageRef::data("image/png", "aGVsbG8=").with_detail("low");
        assert_eq!(image.to_url(), "data:image/png;base64,aGVsbG8=");
        match image.to_content_part() {
            ContentPart::ImageData { detail, .. } => assert_eq!(detail.as_deref(), Some("low")),
            other => panic!("unexpected part {:?}", other),
        }
    }
}
