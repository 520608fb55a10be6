//! Line-delimited JSON-RPC over stdin/stdout — one request per line, one
//! response per line, in order. This is the only transport `nexus-mcp`
//! speaks; there is no HTTP/SSE fallback.

use std::io::{self, BufRead, BufReader, Write};

use tracing::{debug, error, warn};

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;

const FALLBACK_ERROR_LINE: &str = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error"}}"#;

pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Reads requests off stdin until EOF or a read error, dispatching each
    /// to `server` and writing back whatever response (if any) it produces.
    pub async fn run(self, mut server: McpServer) -> Result<(), io::Error> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout = stdout.lock();

        for line in BufReader::new(stdin.lock()).lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("stdin read failed: {e}");
                    break;
                }
            };
            if line.is_empty() {
                continue;
            }
            debug!("received {} bytes", line.len());

            let request = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(r) => r,
                Err(e) => {
                    warn!("malformed JSON-RPC request: {e}");
                    write_response(&mut stdout, &JsonRpcResponse::error(None, JsonRpcError::parse_error()))?;
                    continue;
                }
            };

            if let Some(response) = server.handle_request(request).await {
                write_response(&mut stdout, &response)?;
            }
        }

        Ok(())
    }
}

/// Serializes `response` onto its own line, falling back to a canned
/// internal-error line if serialization itself fails — the client must
/// always get a line back for every request it sent, or it hangs waiting.
fn write_response(out: &mut impl Write, response: &JsonRpcResponse) -> Result<(), io::Error> {
    match serde_json::to_string(response) {
        Ok(json) => {
            debug!("sending {} bytes", json.len());
            writeln!(out, "{json}")?;
        }
        Err(e) => {
            error!("failed to serialize response: {e}");
            writeln!(out, "{FALLBACK_ERROR_LINE}")?;
        }
    }
    out.flush()
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}
