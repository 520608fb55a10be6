//! One file per Query API operation (spec §6); each exposes `schema()` for
//! `tools/list` and `execute()` for `tools/call`.

pub mod bayesian_inference;
pub mod detect_mode;
pub mod entity_extraction;
pub mod graph_query;
pub mod hipporag_retrieve;
pub mod lifecycle_status;
pub mod memory_store;
pub mod observation_timeline;
pub mod rekindle_archived;
pub mod search;
pub mod vector_search;

use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

pub(crate) fn missing_params() -> JsonRpcError {
    JsonRpcError::invalid_params("missing tool arguments")
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(arguments: Option<Value>) -> Result<T, JsonRpcError> {
    let value = arguments.ok_or_else(missing_params)?;
    serde_json::from_value(value).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
}

pub(crate) fn ok_result(value: &impl serde::Serialize) -> Result<CallToolResult, JsonRpcError> {
    CallToolResult::ok(value).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
}
