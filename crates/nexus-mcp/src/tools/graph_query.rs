//! `graph_query` — bounded multi-hop traversal from a set of seed entity
//! ids (C8), grounded on `original_source/src/services/graph_query_engine.py`.

use nexus_core::{EdgeKind, NexusEngine};
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "seeds": {"type": "array", "items": {"type": "string"}, "description": "Entity node ids to start traversal from"},
            "max_hops": {"type": "integer", "default": 3},
            "edge_kinds": {"type": "array", "items": {"type": "string", "enum": ["references", "mentions", "similar_to", "related_to"]}}
        },
        "required": ["seeds"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    seeds: Vec<String>,
    #[serde(default = "default_max_hops")]
    max_hops: usize,
    edge_kinds: Option<Vec<String>>,
}

fn default_max_hops() -> usize {
    3
}

fn parse_edge_kind(raw: &str) -> Result<EdgeKind, JsonRpcError> {
    match raw {
        "references" => Ok(EdgeKind::References),
        "mentions" => Ok(EdgeKind::Mentions),
        "similar_to" => Ok(EdgeKind::SimilarTo),
        "related_to" => Ok(EdgeKind::RelatedTo),
        other => Err(JsonRpcError::invalid_params(&format!("unknown edge kind '{other}'"))),
    }
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let edge_kinds = args.edge_kinds.map(|kinds| kinds.iter().map(|k| parse_edge_kind(k)).collect::<Result<Vec<_>, _>>()).transpose()?;

    let result = engine.graph_query(&args.seeds, args.max_hops, edge_kinds.as_deref());
    ok_result(&serde_json::json!({
        "entities": result.entities,
        "paths": result.paths,
        "distances": result.distances,
    }))
}
