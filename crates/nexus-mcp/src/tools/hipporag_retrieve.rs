//! `hipporag_retrieve` — the graph tier run standalone: extract entities
//! from the query, seed personalized PageRank, rank mentioning chunks
//! (C13), grounded on `original_source/src/services/hipporag_service.py`.

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
            "query": {"type": "string"},
            "top_k": {"type": "integer", "default": 50},
            "multi_hop": {"type": "boolean", "default": false}
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    multi_hop: bool,
}

fn default_top_k() -> usize {
    50
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let results = engine.hipporag_retrieve(&args.query, args.top_k, args.multi_hop);
    let candidates: Vec<Value> = results
        .into_iter()
        .map(|c| serde_json::json!({"chunk_id": c.chunk_id, "text": c.text, "score": c.score, "tier": c.tier, "metadata": c.metadata}))
        .collect();
    ok_result(&serde_json::json!({"results": candidates}))
}
