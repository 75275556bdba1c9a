//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docrag",
    version,
    about = "Grounded question answering over a private document corpus",
    long_about = "Docrag ingests a local document tree into lexical and semantic indexes and \
                  answers questions with citations, a confidence score, and safety notes. \
                  Retrieval is hybrid (BM25 + embeddings) with role-based access filtering."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover documents, rebuild both indexes, and persist them
    Ingest,

    /// Ask a question against the ingested corpus
    Ask {
        /// Question to ask
        question: String,

        /// Caller role used for access filtering
        #[arg(short, long, default_value = "public")]
        role: String,

        /// Optional correlation id carried through logs
        #[arg(long)]
        correlation_id: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show persisted index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the standard location)
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
