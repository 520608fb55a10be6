//! `vector_search` — a pure dense-vector nearest-neighbor lookup (C12),
//! bypassing the fusion/routing that `search` applies.

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
            "top_k": {"type": "integer", "default": 50}
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    50
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let results = engine.vector_search(&args.query, args.top_k);
    ok_result(&serde_json::json!({"results": results.into_iter().map(candidate_json).collect::<Vec<_>>()}))
}

fn candidate_json(c: nexus_core::TierCandidate) -> Value {
    serde_json::json!({"chunk_id": c.chunk_id, "text": c.text, "score": c.score, "tier": c.tier})
}
