//! Nexus CLI
//!
//! Command-line access to the triple-tier memory engine for scripting and
//! operator use, without going through the MCP stdio transport.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use nexus_core::{EventType, IngestRequest, NexusConfig, NexusEngine, QueryMode, QueryOptions, SourceType, TagQuadruple};

/// Nexus - triple-tier retrieval-augmented memory engine CLI
#[derive(Parser)]
#[command(name = "nexus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Nexus memory engine")]
#[command(long_about = "Nexus fuses dense-vector search, personalized-PageRank graph traversal, \
and Bayesian inference behind a single query pipeline, with a four-stage memory lifecycle.")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override storage.data_dir
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a piece of text: tag, chunk, embed, extract entities, persist
    Store {
        /// Text to ingest
        text: String,

        /// Who recorded this
        #[arg(long)]
        who: Option<String>,

        /// Which project this concerns
        #[arg(long)]
        project: Option<String>,

        /// Why this is being recorded
        #[arg(long)]
        why: Option<String>,

        /// Source file path, if any
        #[arg(long)]
        file: Option<String>,

        /// How this text was obtained: witnessed, reported, inferred, or
        /// assumed. Derives confidence unless --confidence overrides it.
        #[arg(long)]
        source_type: Option<String>,

        /// Confidence override in [0, 1], takes precedence over source-type
        #[arg(long)]
        confidence: Option<f64>,

        /// Agent performing the ingest
        #[arg(long, default_value = "cli")]
        agent: String,

        /// Intent behind the ingest
        #[arg(long, default_value = "manual store via CLI")]
        intent: String,
    },

    /// Run the five-step query pipeline
    Search {
        /// Query text
        query: String,

        /// Force a query mode instead of auto-detecting
        #[arg(long)]
        mode: Option<String>,

        /// Override the response token budget
        #[arg(long)]
        token_budget: Option<usize>,

        /// Override per-tier candidate count
        #[arg(long)]
        top_k: Option<usize>,

        /// Expand the graph tier into bounded multi-hop traversal
        #[arg(long)]
        multi_hop: bool,
    },

    /// Pure dense-vector nearest-neighbor search
    VectorSearch {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Preview which mode a query would route to
    DetectMode { query: String },

    /// Extract entity spans from text
    ExtractEntities { text: String },

    /// Chunk counts per lifecycle stage
    LifecycleStatus,

    /// Force a lifecycle sweep (demote/archive/rehydrate scan) now
    LifecycleSweep,

    /// Restore an archived chunk to active by re-reading its source file
    Rekindle {
        chunk_id: String,
        /// Text to re-embed the restored chunk under
        query: String,
    },

    /// Events recorded on the append-only log since a timestamp
    Timeline {
        /// RFC3339 timestamp; defaults to the start of today (UTC)
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Filter to a single event type
        #[arg(long)]
        event_type: Option<String>,
    },
}

fn open_engine(config_path: Option<&PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<NexusEngine> {
    let mut config = NexusConfig::load(config_path.map(|p| p.as_path()))?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }
    Ok(NexusEngine::open(config)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let engine = open_engine(cli.config.as_ref(), cli.data_dir)?;

    match cli.command {
        Commands::Store { text, who, project, why, file, source_type, confidence, agent, intent } => {
            run_store(&engine, text, who, project, why, file, source_type, confidence, agent, intent)?
        }
        Commands::Search { query, mode, token_budget, top_k, multi_hop } => run_search(&engine, query, mode, token_budget, top_k, multi_hop)?,
        Commands::VectorSearch { query, top_k } => run_vector_search(&engine, query, top_k),
        Commands::DetectMode { query } => run_detect_mode(&engine, query),
        Commands::ExtractEntities { text } => run_extract_entities(&engine, text),
        Commands::LifecycleStatus => run_lifecycle_status(&engine)?,
        Commands::LifecycleSweep => run_lifecycle_sweep(&engine)?,
        Commands::Rekindle { chunk_id, query } => run_rekindle(&engine, chunk_id, query)?,
        Commands::Timeline { since, event_type } => run_timeline(&engine, since, event_type)?,
    }

    Ok(())
}

fn parse_source_type(raw: &str) -> anyhow::Result<SourceType> {
    match raw.to_ascii_lowercase().as_str() {
        "witnessed" => Ok(SourceType::Witnessed),
        "reported" => Ok(SourceType::Reported),
        "inferred" => Ok(SourceType::Inferred),
        "assumed" => Ok(SourceType::Assumed),
        other => anyhow::bail!("unknown source type '{other}' (expected witnessed, reported, inferred, or assumed)"),
    }
}

fn run_store(
    engine: &NexusEngine,
    text: String,
    who: Option<String>,
    project: Option<String>,
    why: Option<String>,
    file: Option<String>,
    source_type: Option<String>,
    confidence: Option<f64>,
    agent_name: String,
    intent: String,
) -> anyhow::Result<()> {
    let source_type = source_type.map(|raw| parse_source_type(&raw)).transpose()?;
    let request = IngestRequest {
        text,
        file_path: file,
        tags: TagQuadruple { who, when: Some(Utc::now()), project, why },
        agent_name,
        intent,
        source_type,
        confidence,
    };

    let chunks = engine.memory_store(request)?;
    println!("stored {} chunk(s)", chunks.len());
    for chunk in &chunks {
        println!("  {} ({} chars)", chunk.chunk_id, chunk.text.len());
    }
    Ok(())
}

fn run_search(
    engine: &NexusEngine,
    query: String,
    mode: Option<String>,
    token_budget: Option<usize>,
    top_k: Option<usize>,
    multi_hop: bool,
) -> anyhow::Result<()> {
    let mode = mode.map(|raw| QueryMode::parse_name(&raw).ok_or_else(|| anyhow::anyhow!("unknown mode '{raw}'"))).transpose()?;

    let response = engine.unified_search(&query, QueryOptions { mode, token_budget, top_k, multi_hop });
    println!("detected mode: {:?} (confidence {:.2})", response.detection.mode, response.detection.confidence);
    println!("token budget: {}", response.detection.token_budget);
    println!();
    println!("core ({} candidates):", response.result.core.len());
    for candidate in &response.result.core {
        println!("  [{:?} {:.3}] {}", candidate.tier, candidate.score, truncate(&candidate.text, 100));
    }
    if !response.result.extended.is_empty() {
        println!();
        println!("extended ({} candidates):", response.result.extended.len());
        for candidate in &response.result.extended {
            println!("  [{:?} {:.3}] {}", candidate.tier, candidate.score, truncate(&candidate.text, 100));
        }
    }
    Ok(())
}

fn run_vector_search(engine: &NexusEngine, query: String, top_k: usize) {
    let results = engine.vector_search(&query, top_k);
    println!("{} result(s)", results.len());
    for candidate in &results {
        println!("  [{:.3}] {}", candidate.score, truncate(&candidate.text, 100));
    }
}

fn run_detect_mode(engine: &NexusEngine, query: String) {
    let detection = engine.detect_mode(&query);
    println!("mode: {:?}", detection.mode);
    println!("confidence: {:.2}", detection.confidence);
    println!("token budget: {}", detection.token_budget);
}

fn run_extract_entities(engine: &NexusEngine, text: String) {
    let spans = engine.entity_extraction(&text);
    println!("{} entit{}", spans.len(), if spans.len() == 1 { "y" } else { "ies" });
    for span in &spans {
        println!("  [{:?}] {} ({}..{})", span.entity_type, span.text, span.start, span.end);
    }
}

fn run_lifecycle_status(engine: &NexusEngine) -> anyhow::Result<()> {
    let stats = engine.lifecycle_status()?;
    println!("active:       {}", stats.active);
    println!("demoted:      {}", stats.demoted);
    println!("archived:     {}", stats.archived);
    println!("rehydratable: {}", stats.rehydratable);
    Ok(())
}

fn run_lifecycle_sweep(engine: &NexusEngine) -> anyhow::Result<()> {
    engine.run_lifecycle_sweep()?;
    println!("lifecycle sweep complete");
    run_lifecycle_status(engine)
}

fn run_rekindle(engine: &NexusEngine, chunk_id: String, query: String) -> anyhow::Result<()> {
    let restored = engine.rekindle_archived(&query, &chunk_id)?;
    if restored {
        println!("rekindled {chunk_id}");
    } else {
        println!("could not rekindle {chunk_id}: source file missing or unreadable");
    }
    Ok(())
}

fn run_timeline(engine: &NexusEngine, since: Option<DateTime<Utc>>, event_type: Option<String>) -> anyhow::Result<()> {
    let since = since.unwrap_or_else(|| Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc());
    let event_type = event_type.map(|raw| EventType::parse(&raw).ok_or_else(|| anyhow::anyhow!("unknown event type '{raw}'"))).transpose()?;

    let events = engine.observation_timeline(since, event_type)?;
    println!("{} event(s) since {}", events.len(), since.to_rfc3339());
    for event in &events {
        println!("  [{}] {} {}", event.timestamp.to_rfc3339(), event.event_type.as_str(), event.payload);
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}
