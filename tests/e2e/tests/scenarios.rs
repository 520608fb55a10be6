//! End-to-end coverage for the concrete scenarios the triple-tier engine
//! must satisfy: ingest-then-retrieve, mandatory-tag rejection, auto-fill,
//! Bayesian timeout degradation, and entity consolidation. Each test
//! exercises the public `NexusEngine` surface the way an MCP tool or CLI
//! subcommand would.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use nexus_core::bayes::ProbabilisticEngine;
use nexus_core::{
    EntityConsolidator, EntityType, EventType, IngestRequest, KnowledgeGraph, NexusConfig, NexusEngine, QueryOptions, TagQuadruple, Tier,
};

fn engine() -> NexusEngine {
    NexusEngine::in_memory(NexusConfig::default()).expect("in-memory engine")
}

/// Scenario 1: ingest then retrieve.
#[test]
fn ingest_then_retrieve_finds_the_stored_fact() {
    let engine = engine();

    let request = IngestRequest {
        text: "Tesla was founded by Elon Musk in California in 2003.".to_string(),
        tags: TagQuadruple {
            who: Some("ingester".to_string()),
            when: Some("2025-01-01T00:00:00Z".parse().unwrap()),
            project: Some("demo".to_string()),
            why: Some("documentation".to_string()),
        },
        agent_name: "ingester".to_string(),
        intent: "record a fact".to_string(),
        ..Default::default()
    };
    engine.memory_store(request).expect("ingest succeeds");

    let response = engine.unified_search("Who founded Tesla?", QueryOptions { top_k: Some(3), ..Default::default() });
    assert!(!response.result.core.is_empty(), "at least one item should come back");

    let top = &response.result.core[0];
    assert!(top.text.contains("Tesla"));
    assert!((0.0..=1.0).contains(&top.score));
    assert!(matches!(top.tier, Tier::Vector | Tier::Graph));

    let since = Utc::now() - ChronoDuration::minutes(1);
    let ingests = engine.observation_timeline(since, Some(EventType::Ingest)).unwrap();
    assert_eq!(ingests.len(), 1);
    let queries = engine.observation_timeline(since, Some(EventType::Query)).unwrap();
    assert_eq!(queries.len(), 1);
}

/// Scenario 2: mandatory-tag rejection under a strict policy.
///
/// `NexusEngine` always builds its `MemoryStoreService` with the policy
/// from `config.tagging.strict`; this flips it on and confirms an
/// untagged ingest fails cleanly with no side effects.
#[test]
fn strict_tagging_rejects_untagged_ingest() {
    let mut config = NexusConfig::default();
    config.tagging.strict = true;
    let engine = NexusEngine::in_memory(config).unwrap();

    let request = IngestRequest { text: "an untagged note".to_string(), agent_name: "agent".to_string(), intent: "store".to_string(), ..Default::default() };

    let err = engine.memory_store(request).unwrap_err().to_string();
    for tag in ["who", "when", "project", "why"] {
        assert!(err.contains(tag), "error `{err}` should name missing tag `{tag}`");
    }

    let since = Utc::now() - ChronoDuration::minutes(1);
    assert!(engine.observation_timeline(since, Some(EventType::Ingest)).unwrap().is_empty());

    let stats = engine.lifecycle_status().unwrap();
    assert_eq!(stats.active, 0);
}

/// Scenario 3: auto-fill defaults missing tags instead of rejecting.
#[test]
fn auto_fill_tagging_defaults_missing_tags() {
    let config = NexusConfig::default();
    assert!(!config.tagging.strict, "default policy is auto-fill");
    let engine = NexusEngine::in_memory(config).unwrap();

    let request = IngestRequest { text: "plain note with no tags".to_string(), agent_name: "agent".to_string(), intent: "store".to_string(), ..Default::default() };

    let stored = engine.memory_store(request).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].metadata.tags, vec!["untagged".to_string()]);
    assert_eq!(stored[0].metadata.extras.get("who").map(String::as_str), Some("unknown:mcp-client"));
    assert_eq!(stored[0].metadata.extras.get("why").map(String::as_str), Some("unspecified"));
}

/// Scenario 5: Bayesian timeout degradation. A 1ms budget against a query
/// with enough variables to exceed it must return `None`, not panic or
/// block the caller.
#[test]
fn bayesian_query_degrades_to_none_under_a_tight_timeout() {
    let mut graph = KnowledgeGraph::new();
    for i in 0..40 {
        let id = format!("entity-{i}");
        graph.add_entity_node(&id, EntityType::Concept);
        if i > 0 {
            let _ = graph.add_relationship(&format!("entity-{}", i - 1), nexus_core::EdgeKind::RelatedTo, &id, 0.6);
        }
    }

    let builder = nexus_core::bayes::BayesianNetworkBuilder::default();
    let network = builder.build(&graph).expect("network builds from a populated graph");

    let query_vars: Vec<String> = (0..40).map(|i| format!("entity-{i}")).collect();
    let evidence: HashMap<String, String> = HashMap::new();

    let tight = ProbabilisticEngine::new(Duration::from_nanos(1));
    let result = tight.query_conditional(&network, &query_vars, &evidence);
    assert!(result.is_none(), "a nanosecond budget must degrade to None, not panic");
}

/// Scenario 5b (Nexus-facing view): `bayesian_inference` with no graph
/// data built yet must still succeed with `None`, never an error.
#[test]
fn bayesian_inference_with_no_network_yields_none_not_error() {
    let engine = engine();
    let result = engine.bayesian_inference(&["anything".to_string()], &HashMap::new()).unwrap();
    assert!(result.is_none());
}

/// Scenario 6: entity consolidation merges case/punctuation variants of
/// the same entity into one canonical node.
#[test]
fn entity_consolidation_merges_case_and_punctuation_variants() {
    let mut graph = KnowledgeGraph::new();
    graph.add_entity_node("NASA Rule 10", EntityType::Concept);
    graph.add_entity_node("NASA_Rule_10", EntityType::Concept);
    graph.add_entity_node("nasa rule 10", EntityType::Concept);

    let consolidator = EntityConsolidator::default();
    let report = consolidator.consolidate_all(&mut graph).unwrap();

    assert_eq!(report.groups_found, 1);
    assert_eq!(report.entities_merged, 2);
    assert!(report.consolidation_rate > 0.0);

    // idempotent: running again finds nothing left to merge
    let second = consolidator.consolidate_all(&mut graph).unwrap();
    assert_eq!(second.groups_found, 0);
    assert_eq!(second.entities_merged, 0);
}
