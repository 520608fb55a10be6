//! `observation_timeline` — events recorded on the append-only log since a
//! given timestamp, optionally filtered by type (C5).

use chrono::{DateTime, Utc};
use nexus_core::{EventType, NexusEngine};
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "since": {"type": "string", "description": "RFC3339 timestamp"},
            "event_type": {"type": "string", "enum": ["ingest", "query", "demote", "archive", "rekindle", "consolidation_merge", "graph_edge_added"]}
        },
        "required": ["since"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    since: DateTime<Utc>,
    event_type: Option<String>,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let event_type = args
        .event_type
        .as_deref()
        .map(|s| EventType::parse(s).ok_or_else(|| JsonRpcError::invalid_params(&format!("unknown event type '{s}'"))))
        .transpose()?;

    let events = engine.observation_timeline(args.since, event_type).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    ok_result(&serde_json::json!({"events": events}))
}
