//! `search` — the full five-step SOP across all three tiers (C15).

use nexus_core::{NexusEngine, QueryMode, QueryOptions};
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
            "mode": {"type": "string", "enum": ["execution", "planning", "brainstorming"], "description": "Override automatic mode detection"},
            "token_budget": {"type": "integer", "description": "Override the mode's default token budget"},
            "top_k": {"type": "integer", "description": "Candidates requested per tier before fusion"},
            "multi_hop": {"type": "boolean", "default": false, "description": "Let the graph tier expand beyond direct entity mentions"}
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    mode: Option<String>,
    token_budget: Option<usize>,
    top_k: Option<usize>,
    #[serde(default)]
    multi_hop: bool,
}

fn parse_mode(raw: &str) -> Result<QueryMode, JsonRpcError> {
    QueryMode::parse_name(raw).ok_or_else(|| JsonRpcError::invalid_params(&format!("unknown mode '{raw}'")))
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let mode = args.mode.as_deref().map(parse_mode).transpose()?;

    let options = QueryOptions { mode, token_budget: args.token_budget, top_k: args.top_k, multi_hop: args.multi_hop };
    let response = engine.unified_search(&args.query, options);
    ok_result(&serde_json::json!({
        "detected_mode": response.detection.mode,
        "token_budget": response.detection.token_budget,
        "core": response.result.core,
        "extended": response.result.extended,
        "stats": response.result.stats,
    }))
}
