//! `resources/*` — read-only introspection endpoints alongside the tool
//! calls: lifecycle stage counts and the effective configuration.

use nexus_core::NexusEngine;

use crate::protocol::messages::ResourceDescription;

pub fn list() -> Vec<ResourceDescription> {
    vec![
        ResourceDescription {
            uri: "nexus://status".to_string(),
            name: "Lifecycle status".to_string(),
            description: Some("Chunk counts per lifecycle stage (active/demoted/archived/rehydratable)".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceDescription {
            uri: "nexus://config".to_string(),
            name: "Effective configuration".to_string(),
            description: Some("The configuration this server was started with".to_string()),
            mime_type: Some("application/json".to_string()),
        },
    ]
}

pub fn read(engine: &NexusEngine, uri: &str) -> Result<String, String> {
    match uri {
        "nexus://status" => {
            let stats = engine.lifecycle_status().map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())
        }
        "nexus://config" => serde_json::to_string_pretty(engine.config()).map_err(|e| e.to_string()),
        other => Err(format!("unknown resource uri: {other}")),
    }
}
