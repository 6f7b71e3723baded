use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use gnosis_core::ToolSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{RegistryError, ToolError};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

pub type SharedTool = Arc<dyn Tool>;

/// Callable schema of a registered tool, as declared to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Request-side schema with the name rewritten to `<prefix><name>`.
    pub fn to_schema(&self, prefix: &str) -> ToolSchema {
        ToolSchema::function(
            format!("{}{}", prefix, self.name),
            self.description.clone(),
            self.parameters.clone(),
        )
    }
}

/// Which upstream paths may see a registry entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolScope {
    Completion,
    /// Reserved for a voice-path tool channel. The duplex relay forwards
    /// frames untouched, so such entries are only listed by `/v1/tools` and
    /// kept out of completion requests.
    Voice,
    #[default]
    All,
}

impl ToolScope {
    pub fn includes(self, requested: ToolScope) -> bool {
        self == ToolScope::All || requested == ToolScope::All || self == requested
    }
}

pub struct RegistryEntry {
    implementation: Option<SharedTool>,
    definition: Option<ToolDefinition>,
    scope: ToolScope,
}

impl RegistryEntry {
    fn empty() -> Self {
        Self {
            implementation: None,
            definition: None,
            scope: ToolScope::default(),
        }
    }

    pub fn is_callable(&self) -> bool {
        self.implementation.is_some() && self.definition.is_some()
    }

    pub fn definition(&self) -> Option<&ToolDefinition> {
        self.definition.as_ref()
    }

    pub fn scope(&self) -> ToolScope {
        self.scope
    }
}

/// Result of [`ToolRegistry::execute`]. Failures are values, never panics or
/// propagated errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(Value),
    Error(String),
}

impl ToolOutput {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Success(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolOutput::Success(_) => None,
            ToolOutput::Error(message) => Some(message),
        }
    }

    /// JSON form sent back to the model: the result itself, or `{"error": ...}`.
    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Success(value) => value,
            ToolOutput::Error(message) => json!({ "error": message }),
        }
    }
}

/// Name → entry table. Mutated only while the process starts; request
/// handling goes through `&self` on an `Arc<ToolRegistry>`.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, RegistryEntry>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        implementation: SharedTool,
        definition: ToolDefinition,
        scope: ToolScope,
    ) -> Result<(), RegistryError> {
        let name = validate_name(name.into())?;
        let entry = self.entry_mut(&name);
        if entry.implementation.is_some() || entry.definition.is_some() {
            log::warn!("Tool '{}' registered twice, replacing previous entry", name);
        }
        entry.implementation = Some(implementation);
        entry.definition = Some(with_name(definition, &name));
        entry.scope = scope;
        Ok(())
    }

    /// Register a tool using its own name and schema.
    pub fn register_tool<T>(&mut self, tool: T, scope: ToolScope) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        let definition = tool.to_definition();
        let name = definition.name.clone();
        self.register(name, Arc::new(tool), definition, scope)
    }

    pub fn set_implementation(
        &mut self,
        name: impl Into<String>,
        implementation: SharedTool,
    ) -> Result<(), RegistryError> {
        let name = validate_name(name.into())?;
        let entry = self.entry_mut(&name);
        if entry.implementation.is_some() {
            log::warn!("Replacing implementation of tool '{}'", name);
        }
        entry.implementation = Some(implementation);
        Ok(())
    }

    pub fn set_definition(
        &mut self,
        name: impl Into<String>,
        definition: ToolDefinition,
        scope: ToolScope,
    ) -> Result<(), RegistryError> {
        let name = validate_name(name.into())?;
        let entry = self.entry_mut(&name);
        if entry.definition.is_some() {
            log::warn!("Replacing definition of tool '{}'", name);
        }
        entry.definition = Some(with_name(definition, &name));
        entry.scope = scope;
        Ok(())
    }

    /// The implementation behind `name`, only if the entry is callable.
    pub fn resolve(&self, name: &str) -> Option<SharedTool> {
        self.entries
            .get(name)
            .filter(|entry| entry.is_callable())
            .and_then(|entry| entry.implementation.clone())
    }

    pub fn entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Definitions of every callable entry, in registration order.
    pub fn all_definitions(&self) -> Vec<ToolDefinition> {
        self.definitions_matching(|_| true)
    }

    pub fn definitions_for(&self, scope: ToolScope) -> Vec<ToolDefinition> {
        self.definitions_matching(|entry| entry.scope.includes(scope))
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.is_callable())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn execute(&self, name: &str, args: Value) -> ToolOutput {
        let Some(tool) = self.resolve(name) else {
            return ToolOutput::Error(ToolError::NotFound(name.to_string()).to_string());
        };

        match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(Ok(value)) => ToolOutput::Success(value),
            Ok(Err(error)) => {
                log::warn!("Tool '{}' failed: {}", name, error);
                ToolOutput::Error(error.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Tool '{}' panicked: {}", name, message);
                ToolOutput::Error(format!("Tool '{}' panicked: {}", name, message))
            }
        }
    }

    fn entry_mut(&mut self, name: &str) -> &mut RegistryEntry {
        if !self.entries.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.entries
            .entry(name.to_string())
            .or_insert_with(RegistryEntry::empty)
    }

    fn definitions_matching<F>(&self, predicate: F) -> Vec<ToolDefinition>
    where
        F: Fn(&RegistryEntry) -> bool,
    {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .filter(|entry| entry.is_callable() && predicate(entry))
            .filter_map(|entry| entry.definition.clone())
            .collect()
    }
}

fn validate_name(name: String) -> Result<String, RegistryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidTool(
            "tool name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn with_name(mut definition: ToolDefinition, name: &str) -> ToolDefinition {
    if definition.name != name {
        log::warn!(
            "Definition name '{}' differs from registry key '{}', using the key",
            definition.name,
            name
        );
        definition.name = name.to_string();
    }
    definition
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for TestTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {}
            })
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            Ok(json!({ "reply": self.reply }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            Err(ToolError::Execution("backend down".to_string()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "panicking"
        }

        fn description(&self) -> &str {
            "panics"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            panic!("kaboom")
        }
    }

    fn test_tool(name: &'static str, reply: &'static str) -> TestTool {
        TestTool { name, reply }
    }

    #[test]
    fn definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(test_tool("zeta", "z"), ToolScope::All).unwrap();
        registry.register_tool(test_tool("alpha", "a"), ToolScope::All).unwrap();
        registry.register_tool(test_tool("mid", "m"), ToolScope::All).unwrap();

        let names: Vec<String> = registry
            .all_definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();

        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn re_registration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(test_tool("dup", "first"), ToolScope::All).unwrap();
        registry.register_tool(test_tool("other", "o"), ToolScope::All).unwrap();
        registry.register_tool(test_tool("dup", "second"), ToolScope::All).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.all_definitions()[0].name, "dup");

        let output = registry.execute("dup", json!({})).await;
        assert_eq!(output, ToolOutput::Success(json!({"reply": "second"})));
    }

    #[test]
    fn entry_needs_both_halves_to_be_callable() {
        let mut registry = ToolRegistry::new();
        registry
            .set_definition(
                "half",
                test_tool("half", "h").to_definition(),
                ToolScope::Completion,
            )
            .unwrap();

        assert!(registry.resolve("half").is_none());
        assert!(registry.all_definitions().is_empty());
        assert!(!registry.entry("half").unwrap().is_callable());

        registry
            .set_implementation("half", Arc::new(test_tool("half", "h")))
            .unwrap();

        assert!(registry.resolve("half").is_some());
        assert_eq!(registry.all_definitions().len(), 1);
    }

    #[test]
    fn scope_filters_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(test_tool("chat_only", "c"), ToolScope::Completion).unwrap();
        registry.register_tool(test_tool("voice_only", "v"), ToolScope::Voice).unwrap();
        registry.register_tool(test_tool("shared", "s"), ToolScope::All).unwrap();

        let names = |scope| -> Vec<String> {
            registry
                .definitions_for(scope)
                .into_iter()
                .map(|definition| definition.name)
                .collect()
        };

        assert_eq!(names(ToolScope::Completion), vec!["chat_only", "shared"]);
        assert_eq!(names(ToolScope::Voice), vec!["voice_only", "shared"]);
        assert_eq!(registry.all_definitions().len(), 3);
    }

    #[test]
    fn register_rejects_empty_name() {
        let mut registry = ToolRegistry::new();
        let result = registry.register_tool(test_tool("  ", "x"), ToolScope::All);

        assert!(
            matches!(result, Err(RegistryError::InvalidTool(reason)) if reason == "tool name cannot be empty")
        );
    }

    #[tokio::test]
    async fn execute_unknown_tool_returns_error_value() {
        let registry = ToolRegistry::new();
        let output = registry.execute("missing", json!({})).await;

        assert_eq!(
            output.into_value(),
            json!({"error": "Tool 'missing' not found"})
        );
    }

    #[tokio::test]
    async fn execute_captures_errors_and_panics() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(FailingTool, ToolScope::All).unwrap();
        registry.register_tool(PanickingTool, ToolScope::All).unwrap();

        let failed = registry.execute("failing", json!({})).await;
        assert_eq!(failed.error_message(), Some("Execution failed: backend down"));

        let panicked = registry.execute("panicking", json!({})).await;
        assert!(!panicked.is_success());
        assert!(panicked.error_message().unwrap().contains("kaboom"));
    }

    #[test]
    fn to_schema_prefixes_name() {
        let schema = test_tool("lookup", "x").to_definition().to_schema("gnosis_");

        assert_eq!(schema.schema_type, "function");
        assert_eq!(schema.function.name, "gnosis_lookup");
        assert_eq!(schema.function.description.as_deref(), Some("test tool"));
    }
}
