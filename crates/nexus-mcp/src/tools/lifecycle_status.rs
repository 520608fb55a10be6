//! `lifecycle_status` — a snapshot of how many chunks sit in each of the
//! four lifecycle stages (C16).

use nexus_core::NexusEngine;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::ok_result;

pub fn schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub fn execute(engine: &NexusEngine, _arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let stats = engine.lifecycle_status().map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    ok_result(&stats)
}
