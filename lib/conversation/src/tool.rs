//! Tool registry.
//!
//! Tools are named capabilities the model may invoke. The registry maps each
//! name to its implementation once, at construction, so callers never scan a
//! list by name while a run is in progress.

use crate::error::ToolError;
use crate::message::ToolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Definition of a tool as declared to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for input parameters.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Trait for tool execution.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the given input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid or the capability fails.
    async fn execute(&self, input: JsonValue) -> Result<JsonValue, ToolError>;
}

/// Registry of available tools, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under the name in its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Gets a tool by name, failing if it is not registered.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotFound` if no tool has that name.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })
    }

    /// Executes a tool call against the registered tool of the same name.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotFound` for unregistered names, otherwise the
    /// tool's own error.
    pub async fn invoke(&self, call: &ToolCall) -> Result<JsonValue, ToolError> {
        self.require(&call.name)?.execute(call.arguments.clone()).await
    }

    /// Returns all registered tool definitions, ordered by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo the input back").with_input_schema(
                serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } }
                }),
            )
        }

        async fn execute(&self, input: JsonValue) -> Result<JsonValue, ToolError> {
            input
                .get("text")
                .cloned()
                .ok_or_else(|| ToolError::InvalidInput {
                    name: "echo".to_string(),
                    reason: "missing 'text'".to_string(),
                })
        }
    }

    #[test]
    fn tool_definition_builder() {
        let tool = Echo.definition();
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.input_schema["properties"]["text"]["type"], "string");
    }

    #[test]
    fn registry_operations() {
        let mut registry = ToolRegistry::new();
        assert!(registry.definitions().is_empty());

        registry.register(Arc::new(Echo));

        assert_eq!(registry.definitions().len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.definitions()[0].name, "echo");
    }

    #[tokio::test]
    async fn invoke_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));

        let call = ToolCall::new("call_1", "echo", serde_json::json!({"text": "hi"}));
        let output = registry.invoke(&call).await.expect("echo succeeds");
        assert_eq!(output, serde_json::json!("hi"));
    }

    #[tokio::test]
    async fn invoke_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let call = ToolCall::new("call_1", "missing", serde_json::json!({}));

        let err = registry.invoke(&call).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::NotFound {
                name: "missing".to_string()
            }
        );
    }
}
