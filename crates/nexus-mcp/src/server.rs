//! MCP Server Core
//!
//! Handles the main MCP server logic, routing requests to the Query API
//! tool handlers in `tools/`.

use std::collections::HashMap;
use std::sync::Arc;

use nexus_core::NexusEngine;
use tracing::{debug, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListResourcesResult, ListToolsResult, ReadResourceRequest,
    ReadResourceResult, ResourceContent, ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::{resources, tools};

/// MCP server implementation: one `NexusEngine` behind every session.
pub struct McpServer {
    engine: Arc<NexusEngine>,
    initialized: bool,
}

impl McpServer {
    pub fn new(engine: Arc<NexusEngine>) -> Self {
        Self { engine, initialized: false }
    }

    /// Handle an incoming JSON-RPC request.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("handling request: {}", request.method);

        if request.jsonrpc != crate::protocol::types::JSONRPC_VERSION {
            let message = format!("unsupported jsonrpc version '{}'", request.jsonrpc);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::invalid_request(&message)));
        }

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::server_not_initialized()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params),
            "resources/list" => self.handle_resources_list(),
            "resources/read" => self.handle_resources_read(request.params),
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn handle_initialize(&mut self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo { name: "nexus".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            capabilities: ServerCapabilities {
                tools: Some(HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                resources: Some(HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                prompts: None,
            },
            instructions: Some(
                "Nexus is a triple-tier retrieval-augmented memory engine: dense-vector search, \
                 a personalized-PageRank knowledge graph, and Bayesian probabilistic inference, \
                 unified behind one search tool. Use memory_store to persist new facts with their \
                 WHO/WHEN/PROJECT/WHY tags, and search for the normal query path — it routes, \
                 fans out across all three tiers, fuses, and reranks automatically."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "search".to_string(),
                description: Some("The five-step query pipeline: route, fan out across vector/graph/Bayesian tiers, fuse, filter, rerank.".to_string()),
                input_schema: tools::search::schema(),
            },
            ToolDescription {
                name: "memory_store".to_string(),
                description: Some("Tag, chunk, embed, and persist a piece of text, wiring its mentioned entities into the knowledge graph.".to_string()),
                input_schema: tools::memory_store::schema(),
            },
            ToolDescription {
                name: "vector_search".to_string(),
                description: Some("Pure dense-vector nearest-neighbor search, bypassing fusion.".to_string()),
                input_schema: tools::vector_search::schema(),
            },
            ToolDescription {
                name: "hipporag_retrieve".to_string(),
                description: Some("The graph tier alone: extract entities, seed personalized PageRank, rank mentioning chunks.".to_string()),
                input_schema: tools::hipporag_retrieve::schema(),
            },
            ToolDescription {
                name: "graph_query".to_string(),
                description: Some("Bounded multi-hop traversal from a set of seed entity ids.".to_string()),
                input_schema: tools::graph_query::schema(),
            },
            ToolDescription {
                name: "entity_extraction".to_string(),
                description: Some("Extract person/org/date/etc. entity spans from text.".to_string()),
                input_schema: tools::entity_extraction::schema(),
            },
            ToolDescription {
                name: "detect_mode".to_string(),
                description: Some("Preview which of execution/planning/brainstorming mode a query would route to.".to_string()),
                input_schema: tools::detect_mode::schema(),
            },
            ToolDescription {
                name: "bayesian_inference".to_string(),
                description: Some("Query the posterior probability of entities under the graph-derived Bayesian network.".to_string()),
                input_schema: tools::bayesian_inference::schema(),
            },
            ToolDescription {
                name: "lifecycle_status".to_string(),
                description: Some("Chunk counts per lifecycle stage: active, demoted, archived, rehydratable.".to_string()),
                input_schema: tools::lifecycle_status::schema(),
            },
            ToolDescription {
                name: "observation_timeline".to_string(),
                description: Some("Events recorded on the append-only log since a given timestamp.".to_string()),
                input_schema: tools::observation_timeline::schema(),
            },
            ToolDescription {
                name: "rekindle_archived".to_string(),
                description: Some("Restore an archived chunk to active by re-reading its source file and re-indexing it.".to_string()),
                input_schema: tools::rekindle_archived::schema(),
            },
        ];

        serde_json::to_value(ListToolsResult { tools }).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        let result: Result<CallToolResult, JsonRpcError> = match request.name.as_str() {
            "search" => tools::search::execute(&self.engine, request.arguments),
            "memory_store" => tools::memory_store::execute(&self.engine, request.arguments),
            "vector_search" => tools::vector_search::execute(&self.engine, request.arguments),
            "hipporag_retrieve" => tools::hipporag_retrieve::execute(&self.engine, request.arguments),
            "graph_query" => tools::graph_query::execute(&self.engine, request.arguments),
            "entity_extraction" => tools::entity_extraction::execute(&self.engine, request.arguments),
            "detect_mode" => tools::detect_mode::execute(&self.engine, request.arguments),
            "bayesian_inference" => tools::bayesian_inference::execute(&self.engine, request.arguments),
            "lifecycle_status" => tools::lifecycle_status::execute(&self.engine, request.arguments),
            "observation_timeline" => tools::observation_timeline::execute(&self.engine, request.arguments),
            "rekindle_archived" => tools::rekindle_archived::execute(&self.engine, request.arguments),
            other => {
                warn!("unknown tool: {}", other);
                Err(JsonRpcError::method_not_found_with_message(&format!("unknown tool '{other}'")))
            }
        };

        let result = result.unwrap_or_else(|e| CallToolResult::error(e.to_string()));
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_resources_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        serde_json::to_value(ListResourcesResult { resources: resources::list() }).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_resources_read(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: ReadResourceRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing resource uri")),
        };

        match resources::read(&self.engine, &request.uri) {
            Ok(text) => {
                let result = ReadResourceResult {
                    contents: vec![ResourceContent { uri: request.uri, mime_type: Some("application/json".to_string()), text: Some(text), blob: None }],
                };
                serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
            }
            Err(e) => Err(JsonRpcError::internal_error(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::NexusConfig;
    use serde_json::json;

    fn test_server() -> McpServer {
        let engine = Arc::new(NexusEngine::in_memory(NexusConfig::default()).unwrap());
        McpServer::new(engine)
    }

    fn make_request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: "2.0".to_string(), id: Some(json!(1)), method: method.to_string(), params }
    }

    #[tokio::test]
    async fn uninitialized_server_rejects_non_initialize_requests() {
        let mut server = test_server();
        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn initialize_then_list_tools_includes_search_and_memory_store() {
        let mut server = test_server();
        server.handle_request(make_request("initialize", None)).await;

        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<String> = tools.iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();
        assert!(names.contains(&"search".to_string()));
        assert!(names.contains(&"memory_store".to_string()));
    }

    #[tokio::test]
    async fn store_then_search_round_trips_through_tools_call() {
        let mut server = test_server();
        server.handle_request(make_request("initialize", None)).await;

        let store_args = json!({
            "name": "memory_store",
            "arguments": {"text": "Tesla was founded by Elon Musk.", "agent_name": "tester", "intent": "remember a fact"}
        });
        let response = server.handle_request(make_request("tools/call", Some(store_args))).await.unwrap();
        assert!(response.result.is_some());

        let search_args = json!({"name": "search", "arguments": {"query": "Tesla founding"}});
        let response = server.handle_request(make_request("tools/call", Some(search_args))).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(false));
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_content_not_protocol_error() {
        let mut server = test_server();
        server.handle_request(make_request("initialize", None)).await;

        let args = json!({"name": "nonexistent_tool", "arguments": {}});
        let response = server.handle_request(make_request("tools/call", Some(args))).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let mut server = test_server();
        server.handle_request(make_request("initialize", None)).await;

        let response = server.handle_request(make_request("ping", None)).await.unwrap();
        assert_eq!(response.result.unwrap(), json!({}));
    }
}
