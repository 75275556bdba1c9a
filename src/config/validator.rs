use crate::config::Config;
use crate::error::{DocragError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_policy(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocragError::ConfigValidation { errors })
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "chunk size must be greater than zero",
            ));
        }
        if config.chunking.chunk_overlap >= config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.chunk_overlap",
                "overlap must be smaller than the chunk size",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "embedding dimension must be greater than zero",
            ));
        }
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "model name must not be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.topk_lexical == 0 {
            errors.push(ValidationError::new(
                "retrieval.topk_lexical",
                "lexical top-K must be greater than zero",
            ));
        }
        if config.retrieval.topk_semantic == 0 {
            errors.push(ValidationError::new(
                "retrieval.topk_semantic",
                "semantic top-K must be greater than zero",
            ));
        }
        if config.retrieval.max_context_chars == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_context_chars",
                "context budget must be greater than zero",
            ));
        }
        for (path, weight) in [
            ("retrieval.lexical_weight", config.retrieval.lexical_weight),
            ("retrieval.semantic_weight", config.retrieval.semantic_weight),
        ] {
            if !(weight.is_finite() && weight > 0.0) {
                errors.push(ValidationError::new(
                    path,
                    "fusion weight must be a positive finite number",
                ));
            }
        }
    }

    fn validate_policy(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.policy.roles.is_empty() {
            errors.push(ValidationError::new(
                "policy.roles",
                "at least one role must be configured",
            ));
        }
        for (role, tags) in &config.policy.roles {
            if tags.is_empty() {
                errors.push(ValidationError::new(
                    format!("policy.roles.{}", role),
                    "allowed tag set must not be empty",
                ));
            }
        }
    }
}
