//! Ingest pipeline: discover, chunk, rebuild, persist
//!
//! A zero-argument, idempotent operation; each run fully supersedes prior
//! index state. Replacement indexes are built completely off to the side and
//! swapped into the shared handles under a brief write lock, so a concurrent
//! reader observes either the old or the new index, never a partial one.

use crate::chunk::{Chunk, Chunker};
use crate::config::Config;
use crate::document::discover_documents;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{Bm25Index, InMemoryVectorStore, SemanticIndex};
use std::sync::{Arc, Mutex, RwLock};

/// Outcome of one ingest run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// True when the run returned early without touching the indexes
    pub skipped: bool,
}

/// Full-corpus, exclusive-writer ingest
pub struct Ingestor {
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    lexical: Arc<RwLock<Bm25Index>>,
    semantic: Arc<RwLock<SemanticIndex>>,
    // Ingest must never run concurrently with itself
    build_guard: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
        lexical: Arc<RwLock<Bm25Index>>,
        semantic: Arc<RwLock<SemanticIndex>>,
    ) -> Self {
        Self {
            config,
            provider,
            lexical,
            semantic,
            build_guard: Mutex::new(()),
        }
    }

    /// Discover, chunk, rebuild both indexes, persist, and report
    ///
    /// Configuration problems (missing source tree) and empty corpora are
    /// warning-level early returns with no index mutation, not failures.
    pub fn run(&self) -> Result<IngestReport> {
        let _exclusive = self.build_guard.lock().unwrap();

        let root = &self.config.storage.source_dir;
        if !root.exists() {
            tracing::warn!(path = %root.display(), "ingest skipped: missing source tree");
            return Ok(IngestReport {
                skipped: true,
                ..Default::default()
            });
        }

        let documents = discover_documents(root)?;
        let chunker = Chunker::new(&self.config.chunking);
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| chunker.chunk_document(doc))
            .collect();

        if chunks.is_empty() {
            tracing::warn!(documents = documents.len(), "ingest skipped: no chunks produced");
            return Ok(IngestReport {
                documents: documents.len(),
                skipped: true,
                ..Default::default()
            });
        }

        // Build complete replacements off-lock, then swap
        let mut new_semantic = SemanticIndex::new(
            Arc::clone(&self.provider),
            Box::new(InMemoryVectorStore::new(
                self.config.storage.vector_store_path(),
            )),
        );
        new_semantic.build(&chunks)?;

        let mut new_lexical = Bm25Index::new(self.config.storage.lexical_index_path());
        new_lexical.build(&chunks)?;

        *self.semantic.write().unwrap() = new_semantic;
        *self.lexical.write().unwrap() = new_lexical;

        let report = IngestReport {
            documents: documents.len(),
            chunks: chunks.len(),
            skipped: false,
        };
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            "ingest complete"
        );
        Ok(report)
    }
}
