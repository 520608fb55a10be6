//! `rekindle_archived` — restores an archived chunk back to `Active` by
//! re-reading its source file and re-indexing it (C16), the fourth stage of
//! the memory lifecycle.

use nexus_core::NexusEngine;
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "chunk_id": {"type": "string"},
            "query": {"type": "string", "description": "text to re-embed the restored chunk under"}
        },
        "required": ["chunk_id", "query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    chunk_id: String,
    query: String,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let restored = engine.rekindle_archived(&args.query, &args.chunk_id).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    ok_result(&serde_json::json!({"restored": restored}))
}
