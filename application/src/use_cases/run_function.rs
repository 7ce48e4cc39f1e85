//! Run Function use case.
//!
//! The typed-function layer on top of the tool loop: build the prompt from a
//! [`FunctionPrompt`], run the loop without streaming, retry while the final
//! content is empty, then decode the content into the declared return type.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::ports::tool_schema::ToolSchemaPort;
use crate::registry::CapabilityRegistry;
use crate::use_cases::run_tool_loop::{
    FinalMessage, RunToolLoopError, RunToolLoopInput, RunToolLoopUseCase,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tooloop_domain::core::string::preview;
use tooloop_domain::{DecodeError, DecodeErrorKind, DomainError, FunctionPrompt, decode};
use tracing::{info, warn};

/// Fatal errors of a typed function call.
#[derive(Error, Debug)]
pub enum RunFunctionError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid transcript: {0}")]
    Transcript(#[from] DomainError),

    #[error("Function '{function}' returned empty content after {attempts} attempts")]
    EmptyResponse { function: String, attempts: usize },

    #[error("Function '{function}' returned content that could not be decoded: {source}")]
    Decode {
        function: String,
        raw: String,
        #[source]
        source: DecodeError,
    },
}

impl From<RunToolLoopError> for RunFunctionError {
    fn from(err: RunToolLoopError) -> Self {
        match err {
            RunToolLoopError::Gateway(e) => RunFunctionError::Gateway(e),
            RunToolLoopError::Transcript(e) => RunFunctionError::Transcript(e),
        }
    }
}

/// Input for [`RunFunctionUseCase`].
#[derive(Debug, Clone)]
pub struct RunFunctionInput {
    /// Function name, carried by every error.
    pub name: String,
    pub prompt: FunctionPrompt,
    pub execution: ExecutionParams,
}

impl RunFunctionInput {
    pub fn new(name: impl Into<String>, prompt: FunctionPrompt) -> Self {
        Self {
            name: name.into(),
            prompt,
            execution: ExecutionParams::default(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionParams) -> Self {
        self.execution = execution;
        self
    }
}

/// Decoded result of a typed function call.
#[derive(Debug, Clone)]
pub struct RunFunctionOutput {
    /// Content decoded against the prompt's return type.
    pub value: Value,
    /// The run that produced it.
    pub final_message: FinalMessage,
    /// Number of loop runs, including the successful one.
    pub attempts: usize,
}

/// Use case for calling a typed function.
pub struct RunFunctionUseCase {
    tool_loop: RunToolLoopUseCase,
    tool_schema: Arc<dyn ToolSchemaPort>,
}

impl RunFunctionUseCase {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        registry: Arc<CapabilityRegistry>,
        tool_schema: Arc<dyn ToolSchemaPort>,
    ) -> Self {
        Self {
            tool_loop: RunToolLoopUseCase::new(gateway, registry),
            tool_schema,
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.tool_loop = self.tool_loop.with_conversation_logger(logger);
        self
    }

    /// Run the function and decode its content into a JSON value.
    pub async fn execute(&self, input: RunFunctionInput) -> Result<RunFunctionOutput, RunFunctionError> {
        let RunFunctionInput {
            name,
            prompt,
            execution,
        } = input;

        let messages = prompt.messages();
        let schemas = self
            .tool_schema
            .all_tools_schema(self.tool_loop.registry().tool_spec());
        // Typed functions never stream
        let execution = execution.with_stream(false);
        let max_attempts = execution.retry_times + 1;

        info!(function = %name, tools = schemas.len(), "Calling typed function");

        let mut attempts = 0;
        let final_message = loop {
            attempts += 1;
            let loop_input = RunToolLoopInput::new(name.clone(), messages.clone())
                .with_tool_schemas(schemas.clone())
                .with_execution(execution.clone());
            let result = self.tool_loop.execute(loop_input).await?;

            if !result.content.trim().is_empty() {
                break result;
            }
            if attempts >= max_attempts {
                return Err(RunFunctionError::EmptyResponse {
                    function: name,
                    attempts,
                });
            }
            warn!(
                function = %name,
                attempt = attempts,
                max_attempts,
                "Empty content, retrying"
            );
        };

        let value = decode(&final_message.content, prompt.return_type()).map_err(|source| {
            warn!(
                function = %name,
                raw = %preview(&final_message.content, 200),
                error = %source,
                "Failed to decode function result"
            );
            RunFunctionError::Decode {
                function: name.clone(),
                raw: final_message.content.clone(),
                source,
            }
        })?;

        Ok(RunFunctionOutput {
            value,
            final_message,
            attempts,
        })
    }

    /// Run the function and deserialize the decoded value into `T`.
    pub async fn execute_as<T>(&self, input: RunFunctionInput) -> Result<T, RunFunctionError>
    where
        T: DeserializeOwned,
    {
        let name = input.name.clone();
        let output = self.execute(input).await?;
        serde_json::from_value(output.value).map_err(|e| {
            let raw = output.final_message.content;
            RunFunctionError::Decode {
                function: name,
                source: DecodeError::new(DecodeErrorKind::Deserialize(e.to_string()), raw.clone()),
                raw,
            }
        })
    }
}
