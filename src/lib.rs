//! Docrag - Grounded Question Answering over a Private Corpus
//!
//! Answers natural-language questions against a locally ingested document
//! corpus: hybrid lexical + semantic retrieval, weighted score fusion,
//! role-based access filtering at every stage, and budget-bounded context
//! assembly with citations and guardrail notes.

pub mod answer;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod guardrails;
pub mod index;
pub mod ingest;
pub mod policy;
pub mod retrieval;
pub mod service;

pub use error::{DocragError, Result};
