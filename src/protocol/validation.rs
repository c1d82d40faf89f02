//! Envelope validation applied before routing.

use crate::error::RpcError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use serde_json::Value;

/// Validate a JSON-RPC request before it reaches the method table.
pub fn validate_request(request: &JsonRpcRequest) -> Result<(), RpcError> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(RpcError::invalid_request(format!(
            "Invalid JSON-RPC version: expected '{}', got '{}'",
            JSONRPC_VERSION, request.jsonrpc
        )));
    }

    if request.method.is_empty() {
        return Err(RpcError::invalid_request("Method name cannot be empty"));
    }

    // A null id means the sender could not be following the request form
    match &request.id {
        Value::Null => {
            return Err(RpcError::invalid_request("Request ID must not be null"));
        }
        Value::String(s) if s.is_empty() => {
            return Err(RpcError::invalid_request(
                "Request ID cannot be empty string",
            ));
        }
        _ => {}
    }

    Ok(())
}

/// Validate a JSON-RPC notification.
pub fn validate_notification(notification: &JsonRpcNotification) -> Result<(), RpcError> {
    if notification.jsonrpc != JSONRPC_VERSION {
        return Err(RpcError::invalid_request(format!(
            "Invalid JSON-RPC version: expected '{}', got '{}'",
            JSONRPC_VERSION, notification.jsonrpc
        )));
    }

    if notification.method.is_empty() {
        return Err(RpcError::invalid_request("Method name cannot be empty"));
    }

    Ok(())
}

/// Validate an outbound response: exactly one of result / error.
pub fn validate_response(response: &JsonRpcResponse) -> Result<(), RpcError> {
    if response.jsonrpc != JSONRPC_VERSION {
        return Err(RpcError::invalid_request(format!(
            "Invalid JSON-RPC version: expected '{}', got '{}'",
            JSONRPC_VERSION, response.jsonrpc
        )));
    }

    match (&response.result, &response.error) {
        (Some(_), Some(_)) => Err(RpcError::invalid_request(
            "Response cannot have both result and error",
        )),
        (None, None) => Err(RpcError::invalid_request(
            "Response must have either result or error",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_validate_request() {
        let valid = JsonRpcRequest::new(json!("test-id"), "initialize", None);
        assert!(validate_request(&valid).is_ok());

        let wrong_version = JsonRpcRequest {
            jsonrpc: "1.0".to_string(),
            id: json!(1),
            method: "initialize".to_string(),
            params: None,
        };
        let err = validate_request(&wrong_version).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);

        let null_id = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(null),
            method: "initialize".to_string(),
            params: None,
        };
        assert!(validate_request(&null_id).is_err());
    }

    #[test]
    fn test_validate_notification_version() {
        let bad = JsonRpcNotification {
            jsonrpc: "2.1".to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(validate_notification(&bad).is_err());
        assert!(
            validate_notification(&JsonRpcNotification::new("notifications/initialized", None))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_response_xor() {
        let ok = JsonRpcResponse::success(json!(1), json!({}));
        assert!(validate_response(&ok).is_ok());

        let both = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            result: Some(json!({})),
            error: Some(RpcError::internal_error("x")),
        };
        assert!(validate_response(&both).is_err());

        let neither = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            result: None,
            error: None,
        };
        assert!(validate_response(&neither).is_err());
    }
}
