// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-RPC 2.0 envelope types. Command failures never surface as protocol
//! errors — only malformed requests and unknown methods do (§7).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved for a request body that doesn't parse as JSON-RPC at all.
pub const PARSE_ERROR: i32 = -32700;
/// Reserved for a structurally invalid JSON-RPC request.
pub const INVALID_REQUEST: i32 = -32600;
/// Reserved for a `method` the server doesn't implement.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Reserved for malformed `params` on an otherwise known method.
pub const INVALID_PARAMS: i32 = -32602;
/// Reserved for faults the server could not attribute to the request.
pub const INTERNAL_ERROR: i32 = -32603;

/// An incoming JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`; not enforced strictly, only read.
    #[serde(default)]
    pub jsonrpc: String,
    /// Request identifier. Absent for notifications (no reply expected).
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to invoke, e.g. `"tools/call"`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 response: exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Echoes the request's `id`.
    pub id: Value,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on protocol-level failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a successful response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build a protocol-level error response.
    #[must_use]
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// One of the reserved protocol codes, or an implementation-defined one.
    pub code: i32,
    /// Short human-readable summary.
    pub message: String,
    /// Additional structured context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Construct an error with no extra data.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured diagnostic data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_params_to_null() {
        let req: JsonRpcRequest = serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert_eq!(req.params, Value::Null);
        assert!(req.id.is_none());
    }

    #[test]
    fn success_response_omits_error() {
        let resp = JsonRpcResponse::success(serde_json::json!(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["result"]["ok"], true);
    }

    #[test]
    fn failure_response_omits_result() {
        let resp = JsonRpcResponse::failure(serde_json::json!(1), JsonRpcError::new(METHOD_NOT_FOUND, "nope"));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
    }
}
