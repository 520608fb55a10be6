//! JSON-RPC 2.0 envelope types for the MCP stdio transport: requests,
//! responses, and the standard+MCP-specific error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version of the MCP spec this server speaks during the `initialize`
/// handshake. `"2025-03-26"` is the version that added Streamable HTTP
/// transport support, though this server only implements stdio.
pub const MCP_VERSION: &str = "2025-03-26";

pub const JSONRPC_VERSION: &str = "2.0";

/// An inbound JSON-RPC call. `id: None` marks a notification — the caller
/// does not expect (and must not receive) a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// The reply to a request: exactly one of `result`/`error` is populated,
/// never both, per the JSON-RPC 2.0 spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }
}

/// Standard JSON-RPC codes plus the MCP-reserved `-32000..-32099` band.
#[derive(Debug, Clone, Copy)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    ServerNotInitialized = -32000,
    ResourceNotFound = -32001,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn build(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), data: None }
    }

    pub fn parse_error() -> Self {
        Self::build(ErrorCode::ParseError, "failed to parse JSON-RPC message")
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::build(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found() -> Self {
        Self::build(ErrorCode::MethodNotFound, "method not found")
    }

    pub fn method_not_found_with_message(message: &str) -> Self {
        Self::build(ErrorCode::MethodNotFound, message)
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::build(ErrorCode::InvalidParams, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::build(ErrorCode::InternalError, message)
    }

    pub fn server_not_initialized() -> Self {
        Self::build(ErrorCode::ServerNotInitialized, "server has not completed the initialize handshake")
    }

    #[allow(dead_code)]
    pub fn resource_not_found(uri: &str) -> Self {
        Self::build(ErrorCode::ResourceNotFound, format!("resource not found: {uri}"))
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: Option<Value>, method: &str) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: JSONRPC_VERSION.to_string(), id, method: method.to_string(), params: None }
    }

    #[test]
    fn round_trips_through_json() {
        let req = request(Some(Value::Number(7.into())), "tools/list");
        let json = serde_json::to_string(&req).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "tools/list");
        assert!(!parsed.is_notification());
    }

    #[test]
    fn a_request_with_no_id_is_a_notification() {
        assert!(request(None, "notifications/initialized").is_notification());
    }

    #[test]
    fn success_and_error_responses_are_mutually_exclusive() {
        let ok = JsonRpcResponse::success(Some(Value::Number(1.into())), serde_json::json!({"ok": true}));
        assert!(ok.result.is_some() && ok.error.is_none());

        let err = JsonRpcResponse::error(Some(Value::Number(1.into())), JsonRpcError::method_not_found());
        assert!(err.result.is_none());
        assert_eq!(err.error.unwrap().code, -32601);
    }

    #[test]
    fn server_not_initialized_uses_the_mcp_reserved_band() {
        let err = JsonRpcError::server_not_initialized();
        assert_eq!(err.code, -32000);
    }
}
