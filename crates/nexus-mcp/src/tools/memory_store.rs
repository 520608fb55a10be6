//! `memory_store` — C19, the ingest path (spec §6).

use chrono::{DateTime, Utc};
use nexus_core::{IngestRequest, NexusEngine, SourceType, TagQuadruple};
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::messages::CallToolResult;
use crate::protocol::types::JsonRpcError;

use super::{ok_result, parse_args};

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "text": {"type": "string", "description": "Raw text to store"},
            "file_path": {"type": "string", "description": "Originating file path, if any"},
            "who": {"type": "string", "description": "WHO tag: who asserted this"},
            "when": {"type": "string", "description": "WHEN tag: RFC3339 timestamp the fact holds at"},
            "project": {"type": "string", "description": "PROJECT tag"},
            "why": {"type": "string", "description": "WHY tag: reason this is being stored"},
            "agent_name": {"type": "string", "description": "Calling agent's name"},
            "intent": {"type": "string", "description": "Calling agent's stated intent"},
            "source_type": {"type": "string", "enum": ["witnessed", "reported", "inferred", "assumed"], "description": "How this text was obtained; derives confidence unless overridden"},
            "confidence": {"type": "number", "description": "Confidence override in [0, 1], takes precedence over source_type"}
        },
        "required": ["text", "agent_name", "intent"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    text: String,
    file_path: Option<String>,
    who: Option<String>,
    when: Option<DateTime<Utc>>,
    project: Option<String>,
    why: Option<String>,
    agent_name: String,
    intent: String,
    source_type: Option<SourceType>,
    confidence: Option<f64>,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;

    let request = IngestRequest {
        text: args.text,
        file_path: args.file_path,
        tags: TagQuadruple { who: args.who, when: args.when, project: args.project, why: args.why },
        agent_name: args.agent_name,
        intent: args.intent,
        source_type: args.source_type,
        confidence: args.confidence,
    };

    let stored = engine.memory_store(request).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
    let summary: Vec<_> = stored.iter().map(|c| serde_json::json!({"chunk_id": c.chunk_id, "chunk_index": c.metadata.chunk_index})).collect();
    ok_result(&serde_json::json!({"stored": summary}))
}
