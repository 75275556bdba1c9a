//! Configuration management for docrag
//!
//! Loading, validation, and defaults for the retrieval pipeline. Values such
//! as the fusion weights and the BM25 constants are deliberate defaults, not
//! contracts; deployments override them via the TOML file or environment.

use crate::error::{DocragError, Result};
use crate::policy::AccessTag;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub policy: PolicyConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: "1.0.0".to_string(),
            created_at: current_timestamp(),
        }
    }
}

/// Storage configuration: where sources live and where indexes persist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the document source tree scanned at ingest time
    pub source_dir: PathBuf,
    /// Directory holding persisted index blobs
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Path of the persisted lexical index blob
    pub fn lexical_index_path(&self) -> PathBuf {
        self.data_dir.join("index").join("bm25.json")
    }

    /// Path of the persisted vector store blob
    pub fn vector_store_path(&self) -> PathBuf {
        self.data_dir.join("index").join("vectors.json")
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub chunk_overlap: usize,
    /// Document ids whose chunks are tagged restricted
    #[serde(default)]
    pub restricted_docs: Vec<String>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend selected at construction time
    pub backend: EmbeddingBackend,
    /// Model name for the model backend (e.g. "all-MiniLM-L6-v2")
    pub model: String,
    /// Embedding dimension (shared by both backends)
    pub dimension: usize,
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic hash-seeded projection, no model download
    Hash,
    /// Trained model via fastembed (requires the `model-embeddings` feature)
    Model,
}

/// Retrieval and fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Top-K requested from the lexical index
    pub topk_lexical: usize,
    /// Top-K requested from the semantic index
    pub topk_semantic: usize,
    /// Weight of the normalized lexical score in fusion
    pub lexical_weight: f32,
    /// Weight of the normalized semantic score in fusion
    pub semantic_weight: f32,
    /// Character budget of the context window
    pub max_context_chars: usize,
}

/// Role-based access policy configuration
///
/// The role map is a configuration contract: roles listed as more privileged
/// are expected to carry supersets of less privileged roles. This is verified
/// by tests against the defaults, not enforced at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub roles: HashMap<String, BTreeSet<AccessTag>>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let mut roles = HashMap::new();
        roles.insert("public".to_string(), BTreeSet::from([AccessTag::Public]));
        roles.insert(
            "internal".to_string(),
            BTreeSet::from([AccessTag::Public, AccessTag::Internal]),
        );
        roles.insert(
            "restricted".to_string(),
            BTreeSet::from([AccessTag::Public, AccessTag::Internal, AccessTag::Restricted]),
        );
        Self { roles }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocragError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DOCRAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("DOCRAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| DocragError::InvalidConfigValue {
                path: path.to_string(),
                message: format!("Cannot parse '{}'", value),
            })
        }

        match path {
            "CHUNKING__CHUNK_SIZE" => self.chunking.chunk_size = parse(path, value)?,
            "CHUNKING__CHUNK_OVERLAP" => self.chunking.chunk_overlap = parse(path, value)?,
            "RETRIEVAL__TOPK_LEXICAL" => self.retrieval.topk_lexical = parse(path, value)?,
            "RETRIEVAL__TOPK_SEMANTIC" => self.retrieval.topk_semantic = parse(path, value)?,
            "RETRIEVAL__MAX_CONTEXT_CHARS" => {
                self.retrieval.max_context_chars = parse(path, value)?
            }
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__BACKEND" => {
                self.embedding.backend = match value {
                    "hash" => EmbeddingBackend::Hash,
                    "model" => EmbeddingBackend::Model,
                    _ => {
                        return Err(DocragError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Unknown backend '{}'", value),
                        })
                    }
                };
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DocragError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("docrag").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".docrag"))
            .unwrap_or_else(|| PathBuf::from(".docrag"));

        Self {
            meta: MetaConfig::default(),
            storage: StorageConfig {
                source_dir: data_dir.join("sources"),
                data_dir,
            },
            chunking: ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 120,
                restricted_docs: Vec::new(),
            },
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Hash,
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
            },
            retrieval: RetrievalConfig {
                topk_lexical: 12,
                topk_semantic: 8,
                lexical_weight: 0.45,
                semantic_weight: 0.55,
                max_context_chars: 9000,
            },
            policy: PolicyConfig::default(),
        }
    }
}
