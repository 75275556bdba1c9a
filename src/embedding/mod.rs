//! Embedding backends behind a capability trait
//!
//! The semantic index depends only on [`EmbeddingProvider`]; which backend
//! sits behind it is a construction-time configuration choice, not a runtime
//! availability fallback. The hash projection backend is always compiled in
//! and fully deterministic; a trained model backend (fastembed) is available
//! behind the `model-embeddings` feature.

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Backend '{0}' is not available in this build")]
    BackendUnavailable(String),
}

/// Trait for embedding providers
///
/// Contract: same input text always yields the same fixed-length vector;
/// vectors are unit-normalized so dot product equals cosine similarity.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the backend name
    fn name(&self) -> &str;
}

/// Construct the provider selected by configuration
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.backend {
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        #[cfg(feature = "model-embeddings")]
        EmbeddingBackend::Model => Ok(Arc::new(FastEmbedProvider::new(&config.model)?)),
        #[cfg(not(feature = "model-embeddings"))]
        EmbeddingBackend::Model => Err(EmbeddingError::BackendUnavailable(format!(
            "model ({}); rebuild with --features model-embeddings",
            config.model
        ))),
    }
}

/// Deterministic hash-seeded projection embedder
///
/// Seeds a sine/cosine projection from the BLAKE3 digest of the text. Not a
/// semantic model: its job is a reproducible, unit-length vector per text so
/// the pipeline works offline and in tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let digest = blake3::hash(text.as_bytes());
        let mut seed_bytes = [0u8; 4];
        seed_bytes.copy_from_slice(&digest.as_bytes()[..4]);
        // u32 keeps seed + idx * 31.0 exactly representable in f64
        let seed = u32::from_le_bytes(seed_bytes) as f64;

        let tau = 2.0 * std::f64::consts::PI;
        let mut values: Vec<f64> = (0..self.dimension)
            .map(|idx| {
                let angle = (seed + idx as f64 * 31.0) % tau;
                angle.sin() * 0.5 + angle.cos() * 0.5
            })
            .collect();

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }

        Ok(values.into_iter().map(|v| v as f32).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-projection"
    }
}

/// FastEmbed provider for local trained-model embeddings
#[cfg(feature = "model-embeddings")]
pub struct FastEmbedProvider {
    model: fastembed::TextEmbedding,
    model_name: String,
    dimension: usize,
}

#[cfg(feature = "model-embeddings")]
impl FastEmbedProvider {
    /// Models are downloaded on demand on first use; all-MiniLM-L6-v2 is the
    /// smallest supported option.
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let (embedding_model, dimension) = match model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            _ => {
                return Err(EmbeddingError::InitializationError(format!(
                    "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    model_name
                )));
            }
        };

        tracing::info!(model = model_name, dimension, "initializing embedding model");

        let model =
            TextEmbedding::try_new(InitOptions::new(embedding_model))
                .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model,
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

#[cfg(feature = "model-embeddings")]
impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let embedding = embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
