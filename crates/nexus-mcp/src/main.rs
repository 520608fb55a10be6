//! Nexus MCP Server
//!
//! A stdio JSON-RPC (Model Context Protocol) server exposing the triple-tier
//! retrieval-augmented memory engine: dense-vector search, a personalized-
//! PageRank knowledge graph, and Bayesian probabilistic inference, unified
//! behind a five-step query pipeline and a four-stage memory lifecycle.

mod protocol;
mod resources;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use nexus_core::{NexusConfig, NexusEngine};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// Parses CLI arguments, returning the optional config/data-dir overrides.
/// Exits the process directly for `--help`/`--version`.
fn parse_args() -> (Option<PathBuf>, Option<PathBuf>) {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Nexus MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Triple-tier retrieval-augmented memory engine, served over stdio.");
                println!();
                println!("USAGE:");
                println!("    nexus-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --config <PATH>         YAML configuration file");
                println!("    --data-dir <PATH>       Override storage.data_dir");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG               Log level filter (e.g., debug, info, warn, error)");
                println!("    NEXUS_DATA_DIR         Override storage.data_dir");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("nexus-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" => {
                i += 1;
                config_path = args.get(i).map(PathBuf::from);
                if config_path.is_none() {
                    eprintln!("error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--data-dir" => {
                i += 1;
                data_dir = args.get(i).map(PathBuf::from);
                if data_dir.is_none() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Try 'nexus-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    (config_path, data_dir)
}

#[tokio::main]
async fn main() {
    let (config_path, data_dir) = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("Nexus MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match NexusConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    let engine = match NexusEngine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!("failed to initialize engine: {}", e);
            std::process::exit(1);
        }
    };
    info!("engine initialized");

    // Dropping the scheduler handle doesn't stop the spawned tick loop; it
    // runs for the lifetime of the process.
    let mut scheduler = nexus_core::LifecycleScheduler::new(engine.lifecycle_manager());
    scheduler.start();

    let server = McpServer::new(engine);
    let transport = StdioTransport::new();

    info!("listening on stdio");
    if let Err(e) = transport.run(server).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }

    info!("Nexus MCP Server shutting down");
}
