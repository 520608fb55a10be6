//! `bayesian_inference` — builds (or reuses) the Bayesian network pruned
//! from the knowledge graph and answers a conditional query (C10/C11).

use std::collections::HashMap;

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
            "query_vars": {"type": "array", "items": {"type": "string"}, "description": "Entity ids to query the posterior of"},
            "evidence": {"type": "object", "additionalProperties": {"type": "string"}, "description": "Observed entity id -> state (\"true\"/\"false\")"}
        },
        "required": ["query_vars"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query_vars: Vec<String>,
    #[serde(default)]
    evidence: HashMap<String, String>,
}

pub fn execute(engine: &NexusEngine, arguments: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
    let args: Args = parse_args(arguments)?;
    let result = engine.bayesian_inference(&args.query_vars, &args.evidence).map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;

    let Some(result) = result else {
        return ok_result(&serde_json::json!({"answered": false, "reason": "no queryable variable found or the engine timed out"}));
    };

    let results: HashMap<String, Value> = result
        .results
        .into_iter()
        .map(|(var, (distribution, entropy_bits))| (var, serde_json::json!({"distribution": distribution, "entropy_bits": entropy_bits})))
        .collect();

    ok_result(&serde_json::json!({"answered": true, "evidence": result.evidence, "results": results}))
}
