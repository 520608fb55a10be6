//! `detect_mode` — exposes C18's keyword classifier standalone, useful for
//! callers that want to preview routing before issuing `search`.

use nexus_core::NexusEngine;
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {"query": {"type": "string"}},
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let detection = engine.detect_mode(&args.query);
    ok_result(&detection)
}
