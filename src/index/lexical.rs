//! BM25 lexical index with single-blob persistence
//!
//! `build` replaces all prior state and persists parallel arrays (ids, raw
//! texts, metadata, tokenized texts) as one JSON blob; scoring statistics are
//! recomputed from the tokenized corpus on load, so queries never need the
//! original source documents. Okapi BM25 with rank-style idf flooring; the
//! constants are defaults, not contracts.

use crate::chunk::{Chunk, ChunkMetadata};
use crate::error::{DocragError, Result};
use crate::index::SourceHit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// BM25 free parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    /// Floor for negative idf values, as a fraction of the average idf
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Persisted shape: parallel arrays keyed by ingestion order
#[derive(Debug, Serialize, Deserialize)]
struct IndexBlob {
    ids: Vec<String>,
    texts: Vec<String>,
    metadatas: Vec<ChunkMetadata>,
    tokenized: Vec<Vec<String>>,
}

/// Scoring statistics derived from the tokenized corpus
#[derive(Debug)]
struct Bm25Stats {
    idf: HashMap<String, f64>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_len: Vec<usize>,
    avgdl: f64,
}

/// Sparse keyword-overlap ranking engine over the chunk corpus
pub struct Bm25Index {
    path: PathBuf,
    params: Bm25Params,
    ids: Vec<String>,
    texts: Vec<String>,
    metadatas: Vec<ChunkMetadata>,
    tokenized: Vec<Vec<String>>,
    stats: Option<Bm25Stats>,
}

impl Bm25Index {
    pub fn new(path: PathBuf) -> Self {
        Self::with_params(path, Bm25Params::default())
    }

    pub fn with_params(path: PathBuf, params: Bm25Params) -> Self {
        Self {
            path,
            params,
            ids: Vec::new(),
            texts: Vec::new(),
            metadatas: Vec::new(),
            tokenized: Vec::new(),
            stats: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Index a full chunk corpus, replacing any prior state, then persist
    pub fn build(&mut self, chunks: &[Chunk]) -> Result<()> {
        let tokenized: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| c.text.split_whitespace().map(str::to_string).collect())
            .collect();
        if tokenized.is_empty() {
            return Ok(());
        }

        self.ids = chunks.iter().map(|c| c.id.clone()).collect();
        self.texts = chunks.iter().map(|c| c.text.clone()).collect();
        self.metadatas = chunks.iter().map(|c| c.metadata.clone()).collect();
        self.tokenized = tokenized;
        self.stats = Some(compute_stats(&self.tokenized, self.params));

        self.persist()
    }

    /// Write the blob next to its final path, then atomically rename so a
    /// concurrent reader never observes a partial index
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocragError::Io {
                source: e,
                context: format!("Failed to create index directory: {:?}", parent),
            })?;
        }

        let blob = IndexBlob {
            ids: self.ids.clone(),
            texts: self.texts.clone(),
            metadatas: self.metadatas.clone(),
            tokenized: self.tokenized.clone(),
        };
        let payload = serde_json::to_vec(&blob).map_err(|e| DocragError::Json {
            source: e,
            context: "Failed to serialize lexical index".to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to write lexical index: {:?}", tmp),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to move lexical index into place: {:?}", self.path),
        })
    }

    /// Restore the persisted blob, replacing in-memory state
    ///
    /// A missing file leaves the index empty; a corrupt file is a hard error.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let payload = std::fs::read(&self.path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to read lexical index: {:?}", self.path),
        })?;
        let blob: IndexBlob = serde_json::from_slice(&payload)
            .map_err(|e| DocragError::Index(format!("Corrupt lexical index blob: {}", e)))?;

        self.ids = blob.ids;
        self.texts = blob.texts;
        self.metadatas = blob.metadatas;
        self.tokenized = blob.tokenized;
        self.stats = if self.tokenized.is_empty() {
            None
        } else {
            Some(compute_stats(&self.tokenized, self.params))
        };
        Ok(())
    }

    /// Cheap, idempotent load; safe to call speculatively before every query
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.is_empty() {
            self.load()?;
        }
        Ok(())
    }

    /// Tokenize the query by whitespace and rank the corpus
    ///
    /// Only chunks with a positive score are returned, descending, ties
    /// broken by ingestion order. A never-built index returns nothing.
    pub fn query(&self, text: &str, limit: usize) -> Vec<SourceHit> {
        let Some(stats) = &self.stats else {
            return Vec::new();
        };

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let scores: Vec<f64> = (0..self.ids.len())
            .map(|idx| score_doc(stats, self.params, &tokens, idx))
            .collect();

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
            .into_iter()
            .take(limit)
            .filter(|&idx| scores[idx] > 0.0)
            .map(|idx| SourceHit {
                chunk_id: self.ids[idx].clone(),
                text: self.texts[idx].clone(),
                metadata: self.metadatas[idx].clone(),
                score: scores[idx] as f32,
            })
            .collect()
    }
}

fn compute_stats(tokenized: &[Vec<String>], params: Bm25Params) -> Bm25Stats {
    let n = tokenized.len() as f64;

    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    let mut term_freqs = Vec::with_capacity(tokenized.len());
    let mut doc_len = Vec::with_capacity(tokenized.len());

    for tokens in tokenized {
        doc_len.push(tokens.len());
        let mut freqs: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *freqs.entry(token.clone()).or_insert(0) += 1;
        }
        for term in freqs.keys() {
            *doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        term_freqs.push(freqs);
    }

    let avgdl = doc_len.iter().sum::<usize>() as f64 / n;

    // Okapi idf can go negative for very common terms; floor those at
    // epsilon * average idf, as rank_bm25 does
    let mut idf: HashMap<String, f64> = HashMap::new();
    let mut idf_sum = 0.0;
    let mut negative: Vec<String> = Vec::new();
    for (term, df) in &doc_freq {
        let value = ((n - *df as f64 + 0.5) / (*df as f64 + 0.5)).ln();
        idf_sum += value;
        if value < 0.0 {
            negative.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }
    let average_idf = idf_sum / idf.len().max(1) as f64;
    let floor = params.epsilon * average_idf;
    for term in negative {
        idf.insert(term, floor);
    }

    Bm25Stats {
        idf,
        term_freqs,
        doc_len,
        avgdl,
    }
}

fn score_doc(stats: &Bm25Stats, params: Bm25Params, tokens: &[&str], idx: usize) -> f64 {
    let dl = stats.doc_len[idx] as f64;
    let freqs = &stats.term_freqs[idx];

    tokens
        .iter()
        .filter_map(|token| {
            let idf = stats.idf.get(*token)?;
            let tf = *freqs.get(*token)? as f64;
            let denom = tf + params.k1 * (1.0 - params.b + params.b * dl / stats.avgdl);
            Some(idf * tf * (params.k1 + 1.0) / denom)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use crate::config::ChunkingConfig;
    use crate::document::{Document, Section};
    use tempfile::TempDir;

    fn corpus(texts: &[&str]) -> Vec<Chunk> {
        let chunker = Chunker::new(&ChunkingConfig {
            chunk_size: 1000,
            chunk_overlap: 100,
            restricted_docs: Vec::new(),
        });
        texts
            .iter()
            .enumerate()
            .flat_map(|(i, text)| {
                chunker.chunk_document(&Document {
                    doc_id: format!("doc{i}"),
                    source_path: format!("/srv/doc{i}.txt"),
                    title: format!("doc{i}"),
                    version: "v1".to_string(),
                    sections: vec![Section {
                        heading: "Body".to_string(),
                        text: text.to_string(),
                        loc: "text:1".to_string(),
                    }],
                })
            })
            .collect()
    }

    #[test]
    fn test_unique_token_matches_exactly_one_chunk() {
        let temp = TempDir::new().unwrap();
        let mut index = Bm25Index::new(temp.path().join("bm25.json"));
        index
            .build(&corpus(&[
                "the quick brown fox",
                "a slow green turtle",
                "a second turtle appears",
            ]))
            .unwrap();

        let hits = index.query("fox", 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("fox"));
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let temp = TempDir::new().unwrap();
        let mut index = Bm25Index::new(temp.path().join("bm25.json"));
        index.build(&corpus(&["alpha beta", "gamma delta"])).unwrap();

        assert!(index.query("zeppelin", 10).is_empty());
    }

    #[test]
    fn test_never_built_index_is_silent() {
        let temp = TempDir::new().unwrap();
        let index = Bm25Index::new(temp.path().join("bm25.json"));
        assert!(index.query("anything", 5).is_empty());
    }

    #[test]
    fn test_reload_answers_without_source_corpus() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bm25.json");

        {
            let mut index = Bm25Index::new(path.clone());
            index
                .build(&corpus(&["incident response runbook", "vacation policy"]))
                .unwrap();
        }

        let mut reloaded = Bm25Index::new(path);
        reloaded.ensure_loaded().unwrap();
        assert_eq!(reloaded.len(), 2);

        let hits = reloaded.query("runbook", 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_ensure_loaded_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bm25.json");
        {
            let mut index = Bm25Index::new(path.clone());
            index.build(&corpus(&["only document"])).unwrap();
        }

        let mut index = Bm25Index::new(path);
        index.ensure_loaded().unwrap();
        index.ensure_loaded().unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_corrupt_blob_is_a_hard_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bm25.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let mut index = Bm25Index::new(path);
        match index.load() {
            Err(DocragError::Index(_)) => {}
            other => panic!("expected index error, got {other:?}"),
        }
    }

    #[test]
    fn test_ties_break_by_ingestion_order() {
        let temp = TempDir::new().unwrap();
        let mut index = Bm25Index::new(temp.path().join("bm25.json"));
        // Identical documents score identically; order must be stable
        index
            .build(&corpus(&["turtle pond", "turtle pond"]))
            .unwrap();

        let hits = index.query("turtle", 10);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].metadata.doc_id < hits[1].metadata.doc_id);
    }
}
