//! Layered configuration: defaults -> optional YAML file -> environment overrides.
//!
//! Mirrors the configuration schema the query API is specified against:
//! `storage.data_dir`, `storage.vector_db.{persist_directory,collection_name}`,
//! `embeddings.model`, `chunking.{min_chunk_size,max_chunk_size,overlap}`,
//! `tagging.{strict,auto_fill}`, `reranker.{enabled,model_size,max_length,batch_size}`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NexusError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub vector_db: VectorDbConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            vector_db: VectorDbConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    pub persist_directory: PathBuf,
    pub collection_name: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            persist_directory: PathBuf::from("./data/vectors"),
            collection_name: "memory_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub model: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text-v1.5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 128,
            max_chunk_size: 512,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    pub strict: bool,
    pub auto_fill: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            strict: false,
            auto_fill: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub model_size: String,
    pub max_length: usize,
    pub batch_size: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model_size: "small".to_string(),
            max_length: 512,
            batch_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NexusConfig {
    pub storage: StorageConfig,
    pub embeddings: EmbeddingsConfig,
    pub chunking: ChunkingConfig,
    pub tagging: TaggingConfig,
    pub reranker: RerankerConfig,
}

impl NexusConfig {
    /// Build the effective configuration: defaults, then an optional YAML
    /// file, then environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                serde_yaml::from_str(&text)
                    .map_err(|e| NexusError::Config(format!("invalid config at {:?}: {e}", p)))?
            }
            _ => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(project_dir) = std::env::var("NEXUS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(project_dir);
        }
        if let Ok(persist_dir) = std::env::var("CHROMA_PERSIST_DIR") {
            self.storage.vector_db.persist_directory = PathBuf::from(persist_dir);
        }
        // MEMORY_MCP_PROJECT and OBSIDIAN_VAULT_PATH are read directly by the
        // tagging/ingest path and the (external, out of scope) vault
        // collaborator respectively; they are not part of the typed config
        // tree but are documented here as the full set of recognized
        // environment overrides.
    }
}

/// Reads `MEMORY_MCP_PROJECT`, falling back to `"untagged"` the same way the
/// auto-fill tagging policy does when no project is supplied at all.
pub fn project_from_env() -> Option<String> {
    std::env::var("MEMORY_MCP_PROJECT").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = NexusConfig::default();
        assert_eq!(config.storage.vector_db.collection_name, "memory_chunks");
        assert_eq!(config.chunking.min_chunk_size, 128);
        assert_eq!(config.chunking.max_chunk_size, 512);
        assert!(config.tagging.auto_fill);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = NexusConfig::load(Some(Path::new("/nonexistent/nexus.yaml"))).unwrap();
        assert_eq!(config.chunking.overlap, 50);
    }
}
