//! Tool registry.
//!
//! Maps tool names to descriptors. Built once at startup and never mutated
//! afterwards, so the dispatcher shares it behind an `Arc` without locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::protocol::ToolDefinition;

// =============================================================================
// Handler contract
// =============================================================================

/// Failure raised by a tool handler, surfaced as an `OPERATION_FAILED` error.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub message: String,
    pub data: Option<Value>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<businessmap_core::Error> for ToolError {
    fn from(err: businessmap_core::Error) -> Self {
        let mut data = json!({ "kind": err.kind() });
        if let Some(status) = err.status() {
            data["status"] = json!(status);
        }
        if let businessmap_core::Error::ReadOnly { operation } = &err {
            data["operation"] = json!(operation);
        }
        ToolError::new(err.to_string()).with_data(data)
    }
}

pub type ToolResult = std::result::Result<Value, ToolError>;

/// Executes one tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> ToolResult;
}

// =============================================================================
// Arguments
// =============================================================================

/// Problem with the arguments a caller passed to a tool.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ArgError(pub String);

/// Named arguments of one tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    /// Anything other than a JSON object yields empty arguments.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// String argument; numbers are accepted and rendered as strings.
    pub fn optional_str(&self, name: &str) -> Result<Option<String>, ArgError> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ArgError(format!("Parameter '{}' must be a string", name))),
        }
    }

    pub fn required_str(&self, name: &str) -> Result<String, ArgError> {
        self.optional_str(name)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ArgError(format!("Missing required parameter: {}", name)))
    }

    /// Non-negative integer given either as a number or a numeric string.
    pub fn optional_u32(&self, name: &str) -> Result<Option<u32>, ArgError> {
        let invalid = || ArgError(format!("Parameter '{}' must be a non-negative integer", name));
        match self.present(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    /// Comma-joined list, e.g. `"1,2,3"`. Empty lists read as absent.
    pub fn optional_list(&self, name: &str) -> Result<Option<Vec<String>>, ArgError> {
        Ok(self
            .optional_str(name)?
            .map(|s| businessmap_core::config::split_list(&s))
            .filter(|items| !items.is_empty()))
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
}

impl ParamKind {
    fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
            handler,
        }
    }

    /// JSON Schema of the parameters.
    pub fn parameters(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = json!({
                "type": param.kind.as_str(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters(),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Returned when a tool name is registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Tool '{name}' is already registered")]
pub struct DuplicateToolError {
    pub name: String,
}

/// Tools keyed by name, kept in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), DuplicateToolError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(DuplicateToolError {
                name: descriptor.name,
            });
        }
        tracing::debug!(tool = %descriptor.name, "Registered tool");
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Descriptors in registration order. Each call starts a fresh pass.
    pub fn list(&self) -> std::slice::Iter<'_, ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: ToolArgs) -> ToolResult {
            Ok(Value::Object(args.0))
        }
    }

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            format!("{} tool", name),
            vec![
                ParamSpec::string("query", "Text").required(),
                ParamSpec::integer("limit", "Max").with_default(json!(50)),
            ],
            Arc::new(Echo),
        )
    }

    fn args(value: Value) -> ToolArgs {
        ToolArgs::from_value(value)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();
        registry.register(tool("b")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("b").unwrap().name, "b");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a")).unwrap();

        let err = registry.register(tool("a")).unwrap_err();
        assert_eq!(err.name, "a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_is_ordered_and_restartable() {
        let mut registry = ToolRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(tool(name)).unwrap();
        }

        let first: Vec<_> = registry.list().map(|t| t.name.as_str()).collect();
        let second: Vec<_> = registry.list().map(|t| t.name.as_str()).collect();
        assert_eq!(first, vec!["c", "a", "b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parameters_schema() {
        let schema = tool("a").parameters();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Text"},
                    "limit": {"type": "integer", "description": "Max", "default": 50}
                },
                "required": ["query"]
            })
        );
    }

    #[tokio::test]
    async fn test_handler_receives_args() {
        let descriptor = tool("echo");
        let out = descriptor
            .handler
            .call(args(json!({"query": "x"})))
            .await
            .unwrap();
        assert_eq!(out, json!({"query": "x"}));
    }

    #[test]
    fn test_required_str() {
        let a = args(json!({"card_id": "42", "num": 7, "blank": " ", "nil": null, "bad": []}));
        assert_eq!(a.required_str("card_id").unwrap(), "42");
        assert_eq!(a.required_str("num").unwrap(), "7");
        assert!(a.required_str("blank").is_err());
        assert!(a.required_str("nil").is_err());
        assert!(a.required_str("missing").unwrap_err().0.contains("missing"));
        assert!(a.required_str("bad").unwrap_err().0.contains("must be a string"));
    }

    #[test]
    fn test_optional_u32_accepts_int_or_numeric_string() {
        let a = args(json!({"n": 10, "s": " 25 ", "neg": -1, "word": "ten", "empty": ""}));
        assert_eq!(a.optional_u32("n").unwrap(), Some(10));
        assert_eq!(a.optional_u32("s").unwrap(), Some(25));
        assert_eq!(a.optional_u32("missing").unwrap(), None);
        assert_eq!(a.optional_u32("empty").unwrap(), None);
        assert!(a.optional_u32("neg").is_err());
        assert!(a.optional_u32("word").is_err());
    }

    #[test]
    fn test_optional_list() {
        let a = args(json!({"ids": "1, 2,3", "none": ""}));
        assert_eq!(
            a.optional_list("ids").unwrap(),
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
        assert_eq!(a.optional_list("none").unwrap(), None);
    }

    #[test]
    fn test_non_object_args_are_empty() {
        assert_eq!(args(json!("text")), ToolArgs::default());
        assert_eq!(args(Value::Null), ToolArgs::default());
    }

    #[test]
    fn test_tool_error_from_core_error() {
        let err: ToolError = businessmap_core::Error::from_status(404, "card 9").into();
        assert_eq!(err.message, "Not found: card 9");
        assert_eq!(err.data, Some(json!({"kind": "not_found", "status": 404})));

        let err: ToolError = businessmap_core::Error::ReadOnly {
            operation: "delete_card".to_string(),
        }
        .into();
        assert_eq!(
            err.data,
            Some(json!({"kind": "read_only", "operation": "delete_card"}))
        );
    }
}
