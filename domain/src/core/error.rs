//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Tool reply references unknown tool call id: {0}")]
    OrphanToolReply(String),

    #[error("Tool reply is missing its tool_call_id")]
    MissingToolCallId,
}

impl DomainError {
    /// The tool call id the offending message referenced, if any
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            DomainError::OrphanToolReply(id) => Some(id),
            DomainError::MissingToolCallId => None,
        }
    }
}
