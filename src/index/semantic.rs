//! Semantic index: embedding store with exhaustive cosine scoring
//!
//! `build` embeds every chunk through the configured provider and replaces
//! the store wholesale. Queries embed the question with the same provider and
//! score every stored entry; vectors are unit length, so the dot product is
//! cosine similarity. Persistence goes through the [`VectorStore`] seam; the
//! default store serializes to a JSON blob with an atomic rename, but any
//! backend satisfying the trait works without changing the orchestrator.

use crate::chunk::{Chunk, ChunkMetadata};
use crate::embedding::EmbeddingProvider;
use crate::error::{DocragError, Result};
use crate::index::SourceHit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// One stored (chunk, embedding) tuple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Pluggable persistence backend for the semantic index
pub trait VectorStore: Send + Sync {
    /// Replace the full store contents
    fn replace_all(&mut self, entries: Vec<VectorEntry>) -> Result<()>;

    /// All entries in ingestion order
    fn entries(&self) -> &[VectorEntry];

    /// Restore persisted entries if present; idempotent
    fn load(&mut self) -> Result<()>;
}

/// Default store: in-memory entries persisted as a JSON blob
pub struct InMemoryVectorStore {
    path: PathBuf,
    entries: Vec<VectorEntry>,
}

impl InMemoryVectorStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: Vec::new(),
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    fn replace_all(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocragError::Io {
                source: e,
                context: format!("Failed to create store directory: {:?}", parent),
            })?;
        }

        let payload = serde_json::to_vec(&entries).map_err(|e| DocragError::Json {
            source: e,
            context: "Failed to serialize vector store".to_string(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to write vector store: {:?}", tmp),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to move vector store into place: {:?}", self.path),
        })?;

        self.entries = entries;
        Ok(())
    }

    fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let payload = std::fs::read(&self.path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to read vector store: {:?}", self.path),
        })?;
        self.entries = serde_json::from_slice(&payload)
            .map_err(|e| DocragError::Index(format!("Corrupt vector store blob: {}", e)))?;
        Ok(())
    }
}

/// Dense ranking engine over the chunk corpus
pub struct SemanticIndex {
    provider: Arc<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
}

impl SemanticIndex {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Box<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    pub fn is_empty(&self) -> bool {
        self.store.entries().is_empty()
    }

    pub fn len(&self) -> usize {
        self.store.entries().len()
    }

    /// Embed and store a full chunk corpus, replacing any prior store
    pub fn build(&mut self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts)?;

        let entries = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorEntry {
                chunk_id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
            })
            .collect();

        self.store.replace_all(entries)
    }

    /// Restore persisted entries if present; idempotent
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.is_empty() {
            self.store.load()?;
        }
        Ok(())
    }

    /// Embed the query and return the `limit` most similar entries
    ///
    /// Scores are cosine similarity clamped at zero, descending, ties broken
    /// by ingestion order.
    pub fn query(&self, text: &str, limit: usize) -> Result<Vec<SourceHit>> {
        let entries = self.store.entries();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed(text)?;

        let scores: Vec<f32> = entries
            .iter()
            .map(|entry| dot(&query_embedding, &entry.embedding).max(0.0))
            .collect();

        let mut ranked: Vec<usize> = (0..entries.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|idx| SourceHit {
                chunk_id: entries[idx].chunk_id.clone(),
                text: entries[idx].text.clone(),
                metadata: entries[idx].metadata.clone(),
                score: scores[idx],
            })
            .collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
