//! Extractive answer assembly
//!
//! No generative model: the answer quotes the leading sentence of each
//! accepted context chunk and cites its origin. Confidence grows with the
//! best fused score and the number of distinct documents represented.

use crate::retrieval::ContextWindow;
use serde::Serialize;

/// Maximum quoted characters per citation
const MAX_QUOTE_CHARS: usize = 500;

/// Confidence reported when no evidence was retrieved
const NO_EVIDENCE_CONFIDENCE: f32 = 0.18;

/// One citation backing the answer
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub doc_id: String,
    pub source: String,
    pub loc: String,
    pub quote: String,
}

/// Assembled extractive answer
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
}

/// Build the answer from an ordered context window
pub fn build_answer(window: &ContextWindow) -> Answer {
    if window.is_empty() {
        return Answer {
            text: "I could not find sufficient grounding in the provided documents. \
                   Consider re-ingesting the corpus or rephrasing the question."
                .to_string(),
            citations: Vec::new(),
            confidence: NO_EVIDENCE_CONFIDENCE,
        };
    }

    let max_score = window
        .candidates
        .iter()
        .map(|c| c.score)
        .fold(0.0f32, f32::max);

    let mut citations = Vec::with_capacity(window.len());
    let mut paragraphs = Vec::with_capacity(window.len());

    for candidate in &window.candidates {
        let quote = truncate_chars(first_sentence(&candidate.text), MAX_QUOTE_CHARS);
        let meta = &candidate.metadata;

        paragraphs.push(format!("{} ({} - {})", quote, meta.doc_id, meta.loc));
        citations.push(Citation {
            doc_id: meta.doc_id.clone(),
            source: if meta.title.is_empty() {
                meta.source.clone()
            } else {
                meta.title.clone()
            },
            loc: meta.loc.clone(),
            quote,
        });
    }

    let confidence = (max_score * 0.7 + window.distinct_docs() as f32 * 0.05).clamp(0.25, 1.0);

    Answer {
        text: format!(
            "Based on the ingested documents:\n{}",
            paragraphs.join("\n")
        ),
        citations,
        confidence,
    }
}

/// First sentence of a text span, falling back to the whole trimmed span
fn first_sentence(text: &str) -> String {
    text.split('.')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or_else(|| text.trim())
        .to_string()
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        text
    } else {
        text.chars().take(max).collect()
    }
}
