use docrag::cli::{Cli, Commands, ConfigAction};
use docrag::config::{Config, ConfigValidator};
use docrag::error::{DocragError, Result};
use docrag::index::{Bm25Index, InMemoryVectorStore, SemanticIndex};
use docrag::service::{AskRequest, AskService};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Ingest => cmd_ingest(cli.config)?,
        Commands::Ask {
            question,
            role,
            correlation_id,
            json,
        } => cmd_ask(cli.config, &question, &role, correlation_id, json)?,
        Commands::Status => cmd_status(cli.config)?,
        Commands::Config { action } => cmd_config(cli.config, action)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "docrag=debug" } else { "docrag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // The fmt layer writes whole lines under an internal lock, so events from
    // concurrent requests never interleave mid-record
    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_ingest(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let service = AskService::from_config(config)?;

    let report = service.ingest()?;
    if report.skipped {
        println!("Ingest skipped (missing source tree or empty corpus)");
    } else {
        println!(
            "✓ Ingest complete: {} document(s), {} chunk(s)",
            report.documents, report.chunks
        );
    }
    Ok(())
}

fn cmd_ask(
    config_path: Option<std::path::PathBuf>,
    question: &str,
    role: &str,
    correlation_id: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let service = AskService::from_config(config)?;

    let response = service.ask(AskRequest {
        question: question.to_string(),
        role: role.to_string(),
        correlation_id,
    })?;

    if json {
        let payload = serde_json::to_string_pretty(&response).map_err(|e| DocragError::Json {
            source: e,
            context: "Failed to serialize response".to_string(),
        })?;
        println!("{}", payload);
        return Ok(());
    }

    println!("{}", response.answer);
    if !response.citations.is_empty() {
        println!("\nCitations:");
        for (idx, citation) in response.citations.iter().enumerate() {
            println!(
                "  [{}] {} ({}, {})",
                idx + 1,
                citation.source,
                citation.doc_id,
                citation.loc
            );
        }
    }
    for note in &response.notes {
        println!("note: {note}");
    }
    println!(
        "\nconfidence: {:.2} | {} chunk(s) from {} document(s) in {} ms",
        response.confidence,
        response.metrics.topk,
        response.metrics.docs_used,
        response.metrics.latency_ms
    );
    Ok(())
}

fn cmd_status(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    let mut lexical = Bm25Index::new(config.storage.lexical_index_path());
    lexical.ensure_loaded()?;

    let provider = docrag::embedding::provider_from_config(&config.embedding)?;
    let mut semantic = SemanticIndex::new(
        provider,
        Box::new(InMemoryVectorStore::new(config.storage.vector_store_path())),
    );
    semantic.ensure_loaded()?;

    println!("Docrag Status");
    println!("=============");
    println!("Source tree:    {}", config.storage.source_dir.display());
    println!("Data dir:       {}", config.storage.data_dir.display());
    println!("Lexical index:  {} chunk(s)", lexical.len());
    println!("Semantic index: {} chunk(s)", semantic.len());
    Ok(())
}

fn cmd_config(config_path: Option<std::path::PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| DocragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DocragError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            ConfigValidator::validate(&config)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
    }

    Ok(())
}

fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!("Config file not found, using defaults. Run 'docrag config init' to create one.");
        return Ok(Config::default());
    }

    Config::load(&path)
}
