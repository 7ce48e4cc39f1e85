//! LLM Gateway port
//!
//! Defines the interface for the model-call collaborator: one request and
//! response, or one streamed response delivered over a bounded channel.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tooloop_domain::{LlmResponse, Message, StreamChunk};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Other error: {0}")]
    Other(String),
}

/// Handle for receiving one streamed response.
///
/// Wraps an `mpsc::Receiver`; the producer closes the channel when the turn
/// is complete.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<Result<StreamChunk, GatewayError>>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<Result<StreamChunk, GatewayError>>) -> Self {
        Self { receiver }
    }

    /// Pre-filled handle over a finite list of chunks.
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk
            let _ = tx.try_send(Ok(chunk));
        }
        Self::new(rx)
    }

    /// Receive the next chunk, or `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<Result<StreamChunk, GatewayError>> {
        self.receiver.recv().await
    }

    /// Drain the stream into a list, stopping at the first error.
    pub async fn collect(mut self) -> Result<Vec<StreamChunk>, GatewayError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.receiver.recv().await {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer talks to a model provider.
/// Implementations (adapters) live in the infrastructure layer. `tools` is
/// `None` when no tool schemas should be attached to the request.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send the transcript and get one complete response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, GatewayError>;

    /// Send the transcript and get a streamed response.
    ///
    /// Default implementation calls `chat()` and replays the result as
    /// chunks, so non-streaming adapters work unchanged.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<StreamHandle, GatewayError> {
        let response = self.chat(messages, tools).await?;
        Ok(StreamHandle::from_chunks(response.into_chunks()))
    }
}
