//! JSON-RPC 2.0 envelope types.
//!
//! Every message on either transport is one of these envelopes. A response
//! carries exactly one of `result` or `error`; the [`ResponsePayload`] enum
//! makes the other combination unrepresentable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method listing every registered tool.
pub const METHOD_LIST_TOOLS: &str = "mcp.list_tools";

/// Method invoking one tool: `params = { "tool": name, "params": {...} }`.
pub const METHOD_INVOKE_TOOL: &str = "mcp.invoke_tool";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// JSON-RPC request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Tool name targeted by an `mcp.invoke_tool` request.
    pub fn invoked_tool(&self) -> Option<&str> {
        if self.method != METHOD_INVOKE_TOOL {
            return None;
        }
        self.params.as_ref()?.get("tool")?.as_str()
    }
}

/// Request ID - can be string, number, or null. Absent IDs read as null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(serde_json::Number),
    #[default]
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// JSON-RPC response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// Either the success value or the error of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(JsonRpcError),
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    /// Create an error response.
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    pub fn as_result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            ResponsePayload::Error(err) => Some(err),
            ResponsePayload::Result(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Error codes used on the wire
impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// A tool ran and failed
    pub const OPERATION_FAILED: i32 = -32000;
    /// The HTTP layer could not hand a request to the dispatcher
    pub const INTERNAL_ERROR: i32 = -32000;

    pub fn parse_error(detail: &str) -> Self {
        Self {
            code: Self::PARSE_ERROR,
            message: "Parse error".to_string(),
            data: Some(Value::String(detail.to_string())),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method '{}' not found", method),
            data: None,
        }
    }

    pub fn tool_not_found(tool: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Tool '{}' not found", tool),
            data: None,
        }
    }

    pub fn operation_failed(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code: Self::OPERATION_FAILED,
            message: message.into(),
            data,
        }
    }

    pub fn internal_error(msg: &str) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: msg.to_string(),
            data: None,
        }
    }
}

/// Entry of the `mcp.list_tools` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
