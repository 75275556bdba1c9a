//! Score normalization and weighted fusion of the two retrieval sources

use crate::index::SourceHit;
use crate::retrieval::ScoredCandidate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be positive")]
    InvalidWeights,
}

/// Fusion weights; semantic is weighted higher by default (0.45 / 0.55)
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl FusionWeights {
    pub fn new(lexical: f32, semantic: f32) -> Result<Self, FusionError> {
        if !(lexical > 0.0 && semantic > 0.0 && lexical.is_finite() && semantic.is_finite()) {
            return Err(FusionError::InvalidWeights);
        }
        Ok(Self { lexical, semantic })
    }
}

/// Divide every score by the set's maximum
///
/// A zero maximum leaves the scores unchanged: an all-zero set stays
/// all-zero rather than dividing by zero.
pub fn normalize_max(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max == 0.0 {
        return scores.to_vec();
    }
    scores.iter().map(|s| s / max).collect()
}

/// Merge the two source result lists into fused candidates
///
/// Each source's scores are normalized independently, then summed per chunk
/// id with the configured weights; a chunk seen by only one source keeps a
/// zero score for the other. Output order is deterministic (lexical hits in
/// order, then unseen semantic hits in order); the orchestrator sorts by
/// fused score afterwards.
pub fn fuse(
    lexical: Vec<SourceHit>,
    semantic: Vec<SourceHit>,
    weights: FusionWeights,
) -> Vec<ScoredCandidate> {
    let lexical_norm = normalize_max(&lexical.iter().map(|h| h.score).collect::<Vec<_>>());
    let semantic_norm = normalize_max(&semantic.iter().map(|h| h.score).collect::<Vec<_>>());

    let mut candidates: Vec<ScoredCandidate> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (hit, norm) in lexical.into_iter().zip(lexical_norm) {
        let idx = candidates.len();
        by_id.insert(hit.chunk_id.clone(), idx);
        candidates.push(ScoredCandidate {
            chunk_id: hit.chunk_id,
            text: hit.text,
            metadata: hit.metadata,
            lexical_score: norm,
            semantic_score: 0.0,
            score: 0.0,
        });
    }

    for (hit, norm) in semantic.into_iter().zip(semantic_norm) {
        match by_id.get(&hit.chunk_id) {
            Some(&idx) => candidates[idx].semantic_score = norm,
            None => {
                by_id.insert(hit.chunk_id.clone(), candidates.len());
                candidates.push(ScoredCandidate {
                    chunk_id: hit.chunk_id,
                    text: hit.text,
                    metadata: hit.metadata,
                    lexical_score: 0.0,
                    semantic_score: norm,
                    score: 0.0,
                });
            }
        }
    }

    for candidate in &mut candidates {
        candidate.score =
            weights.lexical * candidate.lexical_score + weights.semantic * candidate.semantic_score;
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;
    use crate::policy::AccessTag;
    use std::collections::BTreeSet;

    fn hit(chunk_id: &str, score: f32) -> SourceHit {
        SourceHit {
            chunk_id: chunk_id.to_string(),
            text: format!("text of {chunk_id}"),
            metadata: ChunkMetadata {
                doc_id: format!("doc-{chunk_id}"),
                source: "/srv/test.txt".to_string(),
                title: "test".to_string(),
                section_heading: "Body".to_string(),
                loc: "text:1".to_string(),
                chunk_span: (0, 10),
                version: "v1".to_string(),
                classification: "internal".to_string(),
                rbac_tags: BTreeSet::from([AccessTag::Public]),
            },
            score,
        }
    }

    const WEIGHTS: FusionWeights = FusionWeights {
        lexical: 0.45,
        semantic: 0.55,
    };

    #[test]
    fn test_normalize_divides_by_max() {
        assert_eq!(normalize_max(&[2.0, 1.0, 4.0]), vec![0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_all_zero_scores_stay_unchanged() {
        assert_eq!(normalize_max(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
        assert!(normalize_max(&[]).is_empty());
    }

    #[test]
    fn test_single_source_keeps_zero_for_other() {
        let fused = fuse(vec![hit("a", 3.0)], Vec::new(), WEIGHTS);

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].lexical_score, 1.0);
        assert_eq!(fused[0].semantic_score, 0.0);
        assert!((fused[0].score - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_chunk_in_both_sources_sums_weighted_scores() {
        let fused = fuse(vec![hit("a", 2.0)], vec![hit("a", 0.8)], WEIGHTS);

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].lexical_score, 1.0);
        assert_eq!(fused[0].semantic_score, 1.0);
        assert!((fused[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sources_normalize_independently() {
        let fused = fuse(
            vec![hit("a", 10.0), hit("b", 5.0)],
            vec![hit("b", 0.4), hit("c", 0.2)],
            WEIGHTS,
        );

        let by_id: HashMap<&str, &ScoredCandidate> =
            fused.iter().map(|c| (c.chunk_id.as_str(), c)).collect();

        assert_eq!(by_id["a"].lexical_score, 1.0);
        assert_eq!(by_id["b"].lexical_score, 0.5);
        assert_eq!(by_id["b"].semantic_score, 1.0);
        assert_eq!(by_id["c"].semantic_score, 0.5);
        assert!((by_id["b"].score - (0.45 * 0.5 + 0.55 * 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_weights_must_be_positive() {
        assert!(FusionWeights::new(0.0, 0.55).is_err());
        assert!(FusionWeights::new(0.45, -1.0).is_err());
        assert!(FusionWeights::new(0.45, 0.55).is_ok());
    }
}
