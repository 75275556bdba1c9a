//! The retrieval orchestrator
//!
//! Owns the index lifecycles: both engines live behind shared read-mostly
//! handles so concurrent retrieves run in parallel while ingest swaps in
//! replacement indexes under a brief write lock.

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::index::{Bm25Index, SemanticIndex};
use crate::policy::RolePolicy;
use crate::retrieval::{fuse, ContextWindow, FusionWeights};
use std::sync::{Arc, RwLock};

/// Queries both indexes, filters, fuses, filters again, and truncates
pub struct Retriever {
    lexical: Arc<RwLock<Bm25Index>>,
    semantic: Arc<RwLock<SemanticIndex>>,
    policy: RolePolicy,
    weights: FusionWeights,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        lexical: Arc<RwLock<Bm25Index>>,
        semantic: Arc<RwLock<SemanticIndex>>,
        policy: RolePolicy,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let weights = FusionWeights::new(config.lexical_weight, config.semantic_weight)
            .map_err(|e| crate::DocragError::Config(e.to_string()))?;

        Ok(Self {
            lexical,
            semantic,
            policy,
            weights,
            config,
        })
    }

    /// Retrieve the policy-filtered, budget-bounded context for a question
    ///
    /// Empty results at any stage are a normal outcome: an empty window,
    /// never an error.
    pub fn retrieve(&self, question: &str, role: &str) -> Result<ContextWindow> {
        // The process may be cold; both loads are cheap and idempotent
        {
            let mut lexical = self.lexical.write().unwrap();
            lexical.ensure_loaded()?;
        }
        {
            let mut semantic = self.semantic.write().unwrap();
            semantic.ensure_loaded()?;
        }

        let lexical_hits = {
            let lexical = self.lexical.read().unwrap();
            lexical.query(question, self.config.topk_lexical)
        };
        let semantic_hits = {
            let semantic = self.semantic.read().unwrap();
            semantic.query(question, self.config.topk_semantic)?
        };

        // Filter each raw source before fusion
        let lexical_hits = self.policy.filter(lexical_hits, role);
        let semantic_hits = self.policy.filter(semantic_hits, role);

        let fused = fuse(lexical_hits, semantic_hits, self.weights);

        // Second filter pass over the fused set; idempotent
        let mut fused = self.policy.filter(fused, role);

        // Stable sort keeps ingestion order on score ties
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        tracing::debug!(
            role,
            candidates = fused.len(),
            budget = self.config.max_context_chars,
            "assembling context window"
        );

        Ok(ContextWindow::fill(fused, self.config.max_context_chars))
    }

    /// Gated retrieve: when the guard flag is closed, no index is touched
    /// and an empty window returns immediately
    pub fn retrieve_gated(
        &self,
        question: &str,
        role: &str,
        allow_context: bool,
    ) -> Result<ContextWindow> {
        if !allow_context {
            return Ok(ContextWindow::empty());
        }
        self.retrieve(question, role)
    }

    #[cfg(test)]
    pub(crate) fn sort_candidates(
        mut fused: Vec<crate::retrieval::ScoredCandidate>,
    ) -> Vec<crate::retrieval::ScoredCandidate> {
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use crate::config::{ChunkingConfig, Config};
    use crate::document::{Document, Section};
    use crate::embedding::HashEmbedder;
    use crate::index::InMemoryVectorStore;
    use crate::retrieval::test_support::candidate;
    use tempfile::TempDir;

    fn build_retriever(temp: &TempDir, docs: &[(&str, &str, bool)]) -> Retriever {
        let config = Config::default();

        let restricted: Vec<String> = docs
            .iter()
            .filter(|(_, _, r)| *r)
            .map(|(id, _, _)| id.to_string())
            .collect();
        let chunker = Chunker::new(&ChunkingConfig {
            chunk_size: 500,
            chunk_overlap: 50,
            restricted_docs: restricted,
        });

        let chunks: Vec<_> = docs
            .iter()
            .flat_map(|(id, text, _)| {
                chunker.chunk_document(&Document {
                    doc_id: id.to_string(),
                    source_path: format!("/srv/{id}.txt"),
                    title: id.to_string(),
                    version: "v1".to_string(),
                    sections: vec![Section {
                        heading: "Body".to_string(),
                        text: text.to_string(),
                        loc: "text:1".to_string(),
                    }],
                })
            })
            .collect();

        let mut lexical = Bm25Index::new(temp.path().join("bm25.json"));
        lexical.build(&chunks).unwrap();

        let mut semantic = SemanticIndex::new(
            Arc::new(HashEmbedder::new(64)),
            Box::new(InMemoryVectorStore::new(temp.path().join("vectors.json"))),
        );
        semantic.build(&chunks).unwrap();

        Retriever::new(
            Arc::new(RwLock::new(lexical)),
            Arc::new(RwLock::new(semantic)),
            RolePolicy::default(),
            config.retrieval,
        )
        .unwrap()
    }

    #[test]
    fn test_retrieve_returns_relevant_context() {
        let temp = TempDir::new().unwrap();
        let retriever = build_retriever(
            &temp,
            &[
                ("runbook", "the incident escalation ladder has four rungs", false),
                ("menu", "the cafeteria serves lunch at noon", false),
            ],
        );

        let window = retriever.retrieve("incident escalation ladder", "public").unwrap();
        assert!(!window.is_empty());
        assert!(window
            .candidates
            .iter()
            .any(|c| c.metadata.doc_id == "runbook" && c.score > 0.0));
    }

    #[test]
    fn test_public_role_never_sees_restricted_chunks() {
        let temp = TempDir::new().unwrap();
        let retriever = build_retriever(
            &temp,
            &[
                ("handbook", "general onboarding guidance for staff", false),
                ("salaries", "confidential salary bands for staff", true),
            ],
        );

        let window = retriever.retrieve("salary bands staff", "public").unwrap();
        assert!(window
            .candidates
            .iter()
            .all(|c| c.metadata.doc_id != "salaries"));

        let privileged = retriever.retrieve("salary bands staff", "restricted").unwrap();
        assert!(privileged
            .candidates
            .iter()
            .any(|c| c.metadata.doc_id == "salaries"));
    }

    #[test]
    fn test_no_evidence_is_a_normal_outcome() {
        let temp = TempDir::new().unwrap();
        let retriever = build_retriever(&temp, &[("doc", "alpha beta gamma", false)]);

        // Nothing lexically matches and the fused set can still carry
        // semantic candidates; an unmatchable role empties it entirely
        let window = retriever.retrieve("zeppelin", "public").unwrap();
        assert!(window.total_chars <= 9000);
    }

    #[test]
    fn test_empty_indexes_yield_empty_window() {
        let temp = TempDir::new().unwrap();
        let retriever = Retriever::new(
            Arc::new(RwLock::new(Bm25Index::new(temp.path().join("bm25.json")))),
            Arc::new(RwLock::new(SemanticIndex::new(
                Arc::new(HashEmbedder::new(64)),
                Box::new(InMemoryVectorStore::new(temp.path().join("vectors.json"))),
            ))),
            RolePolicy::default(),
            Config::default().retrieval,
        )
        .unwrap();

        let window = retriever.retrieve("anything at all", "public").unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_closed_gate_short_circuits() {
        let temp = TempDir::new().unwrap();
        let retriever = build_retriever(&temp, &[("doc", "sensitive things", false)]);

        let window = retriever
            .retrieve_gated("sensitive things", "public", false)
            .unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let sorted = Retriever::sort_candidates(vec![
            candidate("a", "t", 0.2),
            candidate("b", "t", 0.9),
            candidate("c", "t", 0.2),
        ]);

        let ids: Vec<&str> = sorted.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}
