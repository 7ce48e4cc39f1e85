//! Capability port.
//!
//! A [`Capability`] is a caller-registered asynchronous function the model
//! may request by name. Capabilities are registered once, before a run, and
//! are only read while the loop executes.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use tooloop_domain::{ToolArguments, ToolDefinition, ToolError, ToolOutcome};

/// An invocable tool.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Declared schema; `definition().name` is the lookup key.
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool with parsed keyword arguments.
    async fn invoke(&self, args: ToolArguments) -> Result<ToolOutcome, ToolError>;
}

/// Capability backed by an async closure.
///
/// ```ignore
/// let echo = FnCapability::new(ToolDefinition::new("echo", "Echo input"), |args| async move {
///     Ok::<_, ToolError>(ToolOutcome::plain(&args))
/// });
/// ```
pub struct FnCapability<F, Fut> {
    definition: ToolDefinition,
    func: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnCapability<F, Fut>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutcome, ToolError>> + Send,
{
    pub fn new(definition: ToolDefinition, func: F) -> Self {
        Self {
            definition,
            func,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F, Fut>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutcome, ToolError>> + Send,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, args: ToolArguments) -> Result<ToolOutcome, ToolError> {
        (self.func)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_capability_invokes_closure() {
        let cap = FnCapability::new(ToolDefinition::new("double", "Double x"), |args| async move {
            let x = args.get("x").and_then(|v| v.as_i64()).ok_or_else(|| {
                ToolError::invalid_argument("x must be an integer")
            })?;
            Ok::<_, ToolError>(ToolOutcome::plain(&(x * 2)))
        });

        assert_eq!(cap.definition().name, "double");

        let mut args = ToolArguments::new();
        args.insert("x".into(), serde_json::json!(21));
        assert_eq!(
            cap.invoke(args).await.unwrap(),
            ToolOutcome::Plain(serde_json::json!(42))
        );

        let err = cap.invoke(ToolArguments::new()).await.unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");
    }
}
