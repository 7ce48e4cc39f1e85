//! Capability registry.
//!
//! Maps tool names to [`Capability`] implementations and keeps the matching
//! [`ToolSpec`] for schema generation. Built once before a run and shared
//! read-only (behind an `Arc`) across concurrently running tool calls.

use crate::ports::capability::{Capability, FnCapability};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tooloop_domain::{ToolArguments, ToolDefinition, ToolError, ToolOutcome, ToolSpec};
use tracing::debug;

#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    spec: ToolSpec,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability (builder form).
    pub fn register(mut self, capability: impl Capability + 'static) -> Self {
        self.insert(Arc::new(capability));
        self
    }

    /// Register an async closure as a capability.
    pub fn register_fn<F, Fut>(self, definition: ToolDefinition, func: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome, ToolError>> + Send + 'static,
    {
        self.register(FnCapability::new(definition, func))
    }

    /// Insert a capability, replacing any previous one with the same name.
    pub fn insert(&mut self, capability: Arc<dyn Capability>) {
        let definition = capability.definition().clone();
        debug!(tool = %definition.name, "Registering capability");
        self.capabilities
            .insert(definition.name.clone(), capability);
        self.spec.insert(definition);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Declared schemas of every registered capability
    pub fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("tools", &self.spec.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooloop_domain::ToolParameter;

    fn echo_registry() -> CapabilityRegistry {
        CapabilityRegistry::new().register_fn(
            ToolDefinition::new("echo", "Echo the input")
                .with_parameter(ToolParameter::new("text", "Text to echo", true)),
            |args| async move { Ok(ToolOutcome::plain(&args)) },
        )
    }

    #[tokio::test]
    async fn lookup_and_invoke() {
        let registry = echo_registry();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("echo"));
        assert!(registry.get("missing").is_none());

        let echo = registry.get("echo").unwrap();
        let mut args = ToolArguments::new();
        args.insert("text".into(), serde_json::json!("hi"));
        let outcome = echo.invoke(args).await.unwrap();
        assert_eq!(outcome, ToolOutcome::Plain(serde_json::json!({"text": "hi"})));
    }

    #[test]
    fn spec_tracks_registrations() {
        let registry = echo_registry().register_fn(
            ToolDefinition::new("echo", "Replacement"),
            |_args| async move { Ok(ToolOutcome::text("v2")) },
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.tool_spec().get("echo").unwrap().description,
            "Replacement"
        );
        assert_eq!(format!("{:?}", registry), "CapabilityRegistry { tools: [\"echo\"] }");
    }
}
