//! Request dispatcher.
//!
//! Routes a decoded request to the tool registry and always answers with a
//! response envelope; no failure escapes [`Dispatcher::dispatch`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_INVOKE_TOOL, METHOD_LIST_TOOLS,
};
use crate::registry::{ToolArgs, ToolRegistry};

/// Transport-agnostic request router.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher with no per-call timeout.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            call_timeout: None,
        }
    }

    /// Bound every tool invocation. On expiry the handler future is dropped,
    /// which cancels its in-flight gateway request.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one request.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = ?request.id, "Handling request");

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let outcome = match method.as_str() {
            METHOD_LIST_TOOLS => Ok(self.list_tools()),
            METHOD_INVOKE_TOOL => self.invoke_tool(params).await,
            other => {
                warn!(method = other, "Unknown method");
                Err(JsonRpcError::method_not_found(other))
            }
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    fn list_tools(&self) -> Value {
        let definitions: Vec<_> = self.registry.list().map(|t| t.definition()).collect();
        json!(definitions)
    }

    async fn invoke_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let mut params = params.unwrap_or(Value::Null);
        let name = params
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let args = params
            .get_mut("params")
            .map(Value::take)
            .unwrap_or_default();
        let args = ToolArgs::from_value(args);

        let Some(tool) = self.registry.get(&name) else {
            warn!(tool = %name, "Tool not found");
            return Err(JsonRpcError::tool_not_found(&name));
        };

        debug!(tool = %name, "Invoking tool");
        let call = tool.handler.call(args);

        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = %name, timeout = ?limit, "Tool call timed out");
                    return Err(JsonRpcError::operation_failed(
                        format!("Tool '{}' timed out after {:?}", name, limit),
                        Some(json!({ "kind": "timeout" })),
                    ));
                }
            },
            None => call.await,
        };

        outcome.map_err(|e| {
            warn!(tool = %name, error = %e.message, "Tool failed");
            JsonRpcError::operation_failed(e.message, e.data)
        })
    }
}
