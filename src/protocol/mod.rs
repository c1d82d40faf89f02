//! JSON-RPC 2.0 envelopes for the MCP wire dialect.
//!
//! Messages are discriminated structurally: a `method` with an `id` is a
//! request, a `method` without one is a notification, and an `id` with a
//! `result` or `error` member is a response. Batches are not part of this
//! dialect.

pub mod messages;
pub mod router;
pub mod validation;

pub use messages::*;
pub use router::Router;

use crate::error::RpcError;
use serde::{Deserialize, Serialize};

/// MCP protocol revision advertised by `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// Request ID type: string, number, or null on parse failures
pub type RequestId = serde_json::Value;

/// A JSON-RPC request (carries an id, expects exactly one response)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A JSON-RPC notification (no id, never answered)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A JSON-RPC response: `result` XOR `error`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Any inbound JSON-RPC message.
///
/// Untagged: serde tries `Request` first, so a message without an `id`
/// falls through to `Notification`, and a `result`/`error` member lands in
/// `Response`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Parse a JSON-RPC message from a string.
pub fn parse_message(data: &str) -> std::result::Result<JsonRpcMessage, RpcError> {
    serde_json::from_str(data).map_err(|e| RpcError::parse_error(e.to_string()))
}

/// Serialize an outbound message to its wire form.
pub fn serialize_response(response: &JsonRpcResponse) -> std::result::Result<String, RpcError> {
    serde_json::to_string(response).map_err(|e| RpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        match msg {
            JsonRpcMessage::Request(req) => {
                assert_eq!(req.id, json!(1));
                assert_eq!(req.method, "ping");
                assert!(req.params.is_none());
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification_lacks_id() {
        let msg =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn test_parse_response() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":"a","result":{"ok":true}}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Response(_)));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.code.code(), -32700);
    }

    #[test]
    fn test_response_result_xor_error() {
        let ok = JsonRpcResponse::success(json!(7), json!({"status": "pong"}));
        assert!(ok.result.is_some() && ok.error.is_none());

        let err = JsonRpcResponse::error(json!(7), RpcError::method_not_found("nope"));
        assert!(err.result.is_none() && err.error.is_some());

        let wire = serde_json::to_value(&err).unwrap();
        assert!(wire.get("result").is_none());
        assert_eq!(wire["error"]["code"], -32601);
    }

    #[test]
    fn test_serialize_response_single_line() {
        let resp = JsonRpcResponse::success(json!(1), json!({"tools": []}));
        let line = serialize_response(&resp).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"jsonrpc\":\"2.0\""));
    }
}
