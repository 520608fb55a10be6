//! Metadata tagging protocol v1 (spec §6) and the WHO/WHEN/PROJECT/WHY
//! mandatory tag quadruple (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TAGGING_VERSION: &str = "1.0.0";
pub const TAGGING_PROTOCOL: &str = "nexus-memory-engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    /// Reject ingest when a required tag is missing.
    Strict,
    /// Fill missing required tags with documented defaults.
    AutoFill,
}

impl Default for TagPolicy {
    fn default() -> Self {
        TagPolicy::AutoFill
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Witnessed,
    Reported,
    Inferred,
    Assumed,
}

impl SourceType {
    /// Derived confidence per spec §3: witnessed=0.95, reported=0.70,
    /// inferred=0.50, assumed=0.30; default 0.5 when unspecified.
    pub fn confidence(self) -> f64 {
        match self {
            SourceType::Witnessed => 0.95,
            SourceType::Reported => 0.70,
            SourceType::Inferred => 0.50,
            SourceType::Assumed => 0.30,
        }
    }
}

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// The four mandatory tags, before default-filling.
#[derive(Debug, Clone, Default)]
pub struct TagQuadruple {
    pub who: Option<String>,
    pub when: Option<DateTime<Utc>>,
    pub project: Option<String>,
    pub why: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TagValidationError {
    pub missing: Vec<&'static str>,
}

impl std::fmt::Display for TagValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required tags: {:?}", self.missing)
    }
}

impl std::error::Error for TagValidationError {}

/// Result of applying the tagging policy to a raw metadata extras map.
pub struct TaggedMetadata {
    pub envelope: HashMap<String, String>,
    pub auto_filled: Vec<&'static str>,
}

/// Validate and normalize the WHO/WHEN/PROJECT/WHY quadruple plus the full
/// protocol envelope (agent info, timestamps in three forms, intent,
/// protocol version) per spec §6.
pub fn apply_tag_policy(
    tags: TagQuadruple,
    policy: TagPolicy,
    agent_name: &str,
    intent: &str,
) -> Result<TaggedMetadata, TagValidationError> {
    let mut missing = Vec::new();
    if tags.who.is_none() {
        missing.push("who");
    }
    if tags.when.is_none() {
        missing.push("when");
    }
    if tags.project.is_none() {
        missing.push("project");
    }
    if tags.why.is_none() {
        missing.push("why");
    }

    if !missing.is_empty() && matches!(policy, TagPolicy::Strict) {
        return Err(TagValidationError { missing });
    }

    let auto_filled = missing.clone();
    let now = Utc::now();

    let who = tags.who.unwrap_or_else(|| "unknown:mcp-client".to_string());
    let when = tags.when.unwrap_or(now);
    let project = tags
        .project
        .or_else(crate::config::project_from_env)
        .unwrap_or_else(|| "untagged".to_string());
    let why = tags.why.unwrap_or_else(|| "unspecified".to_string());

    let mut envelope = HashMap::new();
    envelope.insert("WHO".to_string(), who.clone());
    envelope.insert("who".to_string(), who);
    envelope.insert("WHEN".to_string(), when.to_rfc3339());
    envelope.insert("when".to_string(), when.to_rfc3339());
    envelope.insert("PROJECT".to_string(), project.clone());
    envelope.insert("project".to_string(), project.clone());
    envelope.insert("WHY".to_string(), why.clone());
    envelope.insert("why".to_string(), why);

    envelope.insert("agent_name".to_string(), agent_name.to_string());
    envelope.insert("agent_category".to_string(), "assistant".to_string());
    envelope.insert("timestamp_iso".to_string(), now.to_rfc3339());
    envelope.insert("timestamp_unix".to_string(), now.timestamp().to_string());
    envelope.insert(
        "timestamp_readable".to_string(),
        now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    envelope.insert("project".to_string(), project);
    envelope.insert("intent".to_string(), intent.to_string());
    envelope.insert("_tagging_version".to_string(), TAGGING_VERSION.to_string());
    envelope.insert(
        "_tagging_protocol".to_string(),
        TAGGING_PROTOCOL.to_string(),
    );

    Ok(TaggedMetadata {
        envelope,
        auto_filled,
    })
}
