//! Chunking: fixed-size overlapping windows over section text
//!
//! Chunks are the atomic unit of retrieval. Identity is a BLAKE3 digest of
//! (document id, section location, intra-section window index), so re-chunking
//! unchanged input reproduces the same ids. Spans are recorded in
//! section-local character offsets over the whitespace-normalized text.

use crate::config::ChunkingConfig;
use crate::document::Document;
use crate::policy::AccessTag;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Immutable retrievable unit of text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: blake3("{doc_id}-{loc}-{index}")
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Metadata carried by every chunk, fixed at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub source: String,
    pub title: String,
    pub section_heading: String,
    /// Location label of the originating section
    pub loc: String,
    /// Character span within the normalized section text
    pub chunk_span: (usize, usize),
    pub version: String,
    /// Document-level classification label (descriptive metadata only;
    /// visibility is governed by `rbac_tags`)
    pub classification: String,
    /// Access tags; always non-empty
    pub rbac_tags: BTreeSet<AccessTag>,
}

/// Splits documents into tagged chunks
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    restricted_docs: HashSet<String>,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
            restricted_docs: config.restricted_docs.iter().cloned().collect(),
        }
    }

    /// Produce the chunk sequence for one document
    ///
    /// Documents on the restricted list get tag `{restricted}` and
    /// classification "restricted"; all others get `{public}` and
    /// classification "internal" and are visible to every role tier.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let (tags, classification) = if self.restricted_docs.contains(&document.doc_id) {
            (BTreeSet::from([AccessTag::Restricted]), "restricted")
        } else {
            (BTreeSet::from([AccessTag::Public]), "internal")
        };

        let mut chunks = Vec::new();
        for section in &document.sections {
            for (idx, (text, start, end)) in windows(&section.text, self.chunk_size, self.chunk_overlap)
                .into_iter()
                .enumerate()
            {
                let id = chunk_id(&document.doc_id, &section.loc, idx);
                chunks.push(Chunk {
                    id,
                    text,
                    metadata: ChunkMetadata {
                        doc_id: document.doc_id.clone(),
                        source: document.source_path.clone(),
                        title: document.title.clone(),
                        section_heading: section.heading.clone(),
                        loc: section.loc.clone(),
                        chunk_span: (start, end),
                        version: document.version.clone(),
                        classification: classification.to_string(),
                        rbac_tags: tags.clone(),
                    },
                });
            }
        }
        chunks
    }
}

/// Deterministic chunk identity; no clock or random state involved
fn chunk_id(doc_id: &str, loc: &str, idx: usize) -> String {
    blake3::hash(format!("{doc_id}-{loc}-{idx}").as_bytes())
        .to_hex()
        .to_string()
}

/// Whitespace-normalize and slide a fixed window across the section text
///
/// Offsets are character indices into the normalized string, so multi-byte
/// text slices safely.
fn windows(text: &str, size: usize, overlap: usize) -> Vec<(String, usize, usize)> {
    let cleaned: Vec<char> = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();

    let mut out = Vec::new();
    let step = size - overlap;
    let mut start = 0usize;
    while start < cleaned.len() {
        let end = cleaned.len().min(start + size);
        out.push((cleaned[start..end].iter().collect(), start, end));
        start += step;
    }
    out
}
