//! Hybrid retrieval: score fusion, policy filtering, budgeted context
//!
//! The orchestrator fans a question out to the lexical and semantic indexes,
//! filters both result sets through the access policy, fuses normalized
//! scores, filters again, and truncates to a character budget.

mod fusion;
mod orchestrator;

pub use fusion::{fuse, normalize_max, FusionError, FusionWeights};
pub use orchestrator::Retriever;

use crate::chunk::ChunkMetadata;
use crate::policy::{AccessTag, Tagged};
use serde::Serialize;
use std::collections::BTreeSet;

/// Per-query candidate: one chunk with per-source and fused scores
///
/// Exists only for the duration of one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Normalized lexical score; zero when the lexical source missed it
    pub lexical_score: f32,
    /// Normalized semantic score; zero when the semantic source missed it
    pub semantic_score: f32,
    /// Weighted sum of the normalized source scores
    pub score: f32,
}

impl Tagged for ScoredCandidate {
    fn rbac_tags(&self) -> &BTreeSet<AccessTag> {
        &self.metadata.rbac_tags
    }
    fn tag_subject(&self) -> &str {
        &self.chunk_id
    }
}

/// Final ordered, budget-bounded candidate list handed to answer assembly
///
/// Built fresh per query, never cached.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextWindow {
    pub candidates: Vec<ScoredCandidate>,
    /// Character total of the accepted candidate texts
    pub total_chars: usize,
}

impl ContextWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Greedily accept candidates (already sorted by fused score) until the
    /// next one would exceed the budget
    ///
    /// The first candidate is always accepted, even alone over budget, so a
    /// non-empty candidate list never produces an empty window.
    pub fn fill(sorted: Vec<ScoredCandidate>, max_chars: usize) -> Self {
        let mut window = Self::empty();
        for candidate in sorted {
            let length = candidate.text.chars().count();
            if window.total_chars + length > max_chars && !window.candidates.is_empty() {
                break;
            }
            window.total_chars += length;
            window.candidates.push(candidate);
        }
        window
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Number of distinct source documents represented
    pub fn distinct_docs(&self) -> usize {
        self.candidates
            .iter()
            .map(|c| c.metadata.doc_id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::candidate;
    use super::*;

    #[test]
    fn test_budget_is_respected() {
        let sorted = vec![
            candidate("a", &"x".repeat(40), 0.9),
            candidate("b", &"y".repeat(40), 0.8),
            candidate("c", &"z".repeat(40), 0.7),
        ];

        let window = ContextWindow::fill(sorted, 100);
        assert_eq!(window.len(), 2);
        assert!(window.total_chars <= 100);
    }

    #[test]
    fn test_first_candidate_always_accepted() {
        let sorted = vec![
            candidate("a", &"x".repeat(500), 0.9),
            candidate("b", "short", 0.8),
        ];

        let window = ContextWindow::fill(sorted, 100);
        assert_eq!(window.len(), 1);
        assert_eq!(window.candidates[0].chunk_id, "a");
        assert_eq!(window.total_chars, 500);
    }

    #[test]
    fn test_empty_input_gives_empty_window() {
        let window = ContextWindow::fill(Vec::new(), 100);
        assert!(window.is_empty());
        assert_eq!(window.total_chars, 0);
    }

    #[test]
    fn test_distinct_docs_counts_documents_not_chunks() {
        let mut a = candidate("a", "one", 0.9);
        let mut b = candidate("b", "two", 0.8);
        a.metadata.doc_id = "same".to_string();
        b.metadata.doc_id = "same".to_string();

        let window = ContextWindow::fill(vec![a, b], 100);
        assert_eq!(window.len(), 2);
        assert_eq!(window.distinct_docs(), 1);
    }
}
