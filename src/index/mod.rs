//! Index engines: lexical (BM25) and semantic (embedding similarity)
//!
//! Both engines are full-rebuild structures with explicit `build`/`load`/
//! `query` lifecycles owned by the orchestrator; nothing here is a module
//! singleton. Each returns [`SourceHit`]s that carry the chunk's metadata so
//! the access policy can filter results at the source.

mod lexical;
mod semantic;

pub use lexical::{Bm25Index, Bm25Params};
pub use semantic::{InMemoryVectorStore, SemanticIndex, VectorEntry, VectorStore};

use crate::chunk::ChunkMetadata;
use crate::policy::{AccessTag, Tagged};
use std::collections::BTreeSet;

/// One scored result from a single retrieval source
#[derive(Debug, Clone)]
pub struct SourceHit {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Raw, source-specific score; normalized later by the orchestrator
    pub score: f32,
}

impl Tagged for SourceHit {
    fn rbac_tags(&self) -> &BTreeSet<AccessTag> {
        &self.metadata.rbac_tags
    }
    fn tag_subject(&self) -> &str {
        &self.chunk_id
    }
}
