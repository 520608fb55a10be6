//! `entity_extraction` — runs the regex entity fallback (C3) over raw text.

use nexus_core::NexusEngine;
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {"text": {"type": "string"}},
        "required": ["text"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    text: String,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let spans: Vec<Value> = engine
        .entity_extraction(&args.text)
        .into_iter()
        .map(|span| serde_json::json!({"text": span.text, "entity_type": span.entity_type, "start": span.start, "end": span.end}))
        .collect();
    ok_result(&serde_json::json!({"entities": spans}))
}
