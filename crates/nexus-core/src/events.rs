//! Event record types shared by the append-only log (C5) and every
//! component that appends to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Ingest,
    Query,
    Demote,
    Archive,
    Rekindle,
    ConsolidationMerge,
    GraphEdgeAdded,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Ingest => "ingest",
            EventType::Query => "query",
            EventType::Demote => "demote",
            EventType::Archive => "archive",
            EventType::Rekindle => "rekindle",
            EventType::ConsolidationMerge => "consolidation_merge",
            EventType::GraphEdgeAdded => "graph_edge_added",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ingest" => Some(EventType::Ingest),
            "query" => Some(EventType::Query),
            "demote" => Some(EventType::Demote),
            "archive" => Some(EventType::Archive),
            "rekindle" => Some(EventType::Rekindle),
            "consolidation_merge" => Some(EventType::ConsolidationMerge),
            "graph_edge_added" => Some(EventType::GraphEdgeAdded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub chunk_id: Option<String>,
    pub payload: serde_json::Value,
}

impl EventRecord {
    pub fn new(event_type: EventType, chunk_id: Option<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            chunk_id,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_str() {
        for ty in [
            EventType::Ingest,
            EventType::Query,
            EventType::Demote,
            EventType::Archive,
            EventType::Rekindle,
            EventType::ConsolidationMerge,
            EventType::GraphEdgeAdded,
        ] {
            assert_eq!(EventType::parse(ty.as_str()), Some(ty));
        }
    }
}
