//! Error types for the MCP host SDK.
//!
//! Protocol-level failures are carried by [`RpcError`], a tagged error that
//! holds its JSON-RPC error code explicitly and serializes directly into the
//! `error` member of a response. Builder and runtime failures use separate
//! enums so callers can match on them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for server runtime operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// JSON-RPC error codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum ErrorCode {
    /// Invalid JSON was received (-32700)
    ParseError,
    /// The JSON sent is not a valid request object (-32600)
    InvalidRequest,
    /// The method does not exist (-32601)
    MethodNotFound,
    /// Invalid method parameters (-32602)
    InvalidParams,
    /// Internal JSON-RPC error (-32603)
    InternalError,
    /// A handler-chosen code outside the reserved set
    Other(i32),
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> i32 {
        code.code()
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> ErrorCode {
        match code {
            -32700 => ErrorCode::ParseError,
            -32600 => ErrorCode::InvalidRequest,
            -32601 => ErrorCode::MethodNotFound,
            -32602 => ErrorCode::InvalidParams,
            -32603 => ErrorCode::InternalError,
            other => ErrorCode::Other(other),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A JSON-RPC error, constructed with its code at the throw site.
///
/// Serializes to the wire shape `{ "code": i32, "message": .., "data"? }`.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Create a parse error (-32700)
    pub fn parse_error(msg: impl Into<String>) -> Self {
        RpcError::new(ErrorCode::ParseError, msg)
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        RpcError::new(ErrorCode::InvalidRequest, msg)
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        RpcError::new(
            ErrorCode::MethodNotFound,
            format!("Method '{}' not found", method.into()),
        )
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        RpcError::new(ErrorCode::InvalidParams, msg)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        RpcError::new(ErrorCode::InternalError, msg)
    }
}

/// Error returned by a capability handler.
///
/// Handlers that want a specific JSON-RPC code on propagation set one via
/// [`HandlerError::with_code`]; otherwise the router supplies -32603.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub code: Option<i32>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        HandlerError {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Convert into a wire error, falling back to `fallback` when the
    /// handler did not pick a code.
    pub fn into_rpc_error(self, fallback: ErrorCode) -> RpcError {
        let code = self.code.map(ErrorCode::from).unwrap_or(fallback);
        RpcError::new(code, self.message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::new(message)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::new(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::new(err.to_string())
    }
}

/// Errors raised while assembling a server: bad names, duplicate
/// registrations, malformed schemas, failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    #[error("Invalid version '{0}': expected MAJOR.MINOR[.PATCH][-pre][+build]")]
    InvalidVersion(String),

    #[error("Invalid {kind} name '{name}': must match [A-Za-z0-9_-]+")]
    InvalidCapabilityName { kind: &'static str, name: String },

    #[error("{kind} '{name}' has an empty description")]
    EmptyDescription { kind: &'static str, name: String },

    #[error("Resource URI cannot be empty")]
    EmptyResourceUri,

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Resource '{0}' is already registered")]
    DuplicateResource(String),

    #[error("Prompt '{0}' is already registered")]
    DuplicatePrompt(String),

    #[error("Tool '{tool}': parameter '{parameter}' has unknown type '{ty}'")]
    UnknownSchemaType {
        tool: String,
        parameter: String,
        ty: String,
    },

    #[error("Tool '{tool}': invalid schema: {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Errors from server lifecycle and transport plumbing.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::Other(-32000).code(), -32000);
    }

    #[test]
    fn test_error_code_roundtrip() {
        assert_eq!(ErrorCode::from(-32700), ErrorCode::ParseError);
        assert_eq!(ErrorCode::from(-32601), ErrorCode::MethodNotFound);
        assert_eq!(ErrorCode::from(-32099), ErrorCode::Other(-32099));
    }

    #[test]
    fn test_rpc_error_serializes_numeric_code() {
        let err = RpcError::method_not_found("tools/rename");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], -32601);
        assert_eq!(value["message"], "Method 'tools/rename' not found");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_handler_error_code_fallback() {
        let plain = HandlerError::new("boom").into_rpc_error(ErrorCode::InternalError);
        assert_eq!(plain.code, ErrorCode::InternalError);

        let coded = HandlerError::with_code("nope", -32001).into_rpc_error(ErrorCode::InternalError);
        assert_eq!(coded.code, ErrorCode::Other(-32001));
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::UnknownSchemaType {
            tool: "echo".to_string(),
            parameter: "text".to_string(),
            ty: "str".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tool 'echo': parameter 'text' has unknown type 'str'"
        );
    }
}
