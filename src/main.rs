use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use als_buddy::api::{self, AskRequest, ChatRequest};
use als_buddy::context::PromptBuilder;
use als_buddy::core::config::{AppConfig, AppPaths, ConfigService, EmbeddingBackend};
use als_buddy::core::logging;
use als_buddy::llm::OpenAiCompatProvider;
use als_buddy::rag::IndexRepository;
use als_buddy::state::{AppState, Providers};

#[derive(Parser)]
#[command(name = "als-buddy", about = "ALS Buddy - retrieval-augmented ALS assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); overrides config.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from scraped articles.
    Ingest {
        /// JSON array of {url, content} records.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Ask a single question.
    Ask {
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Answer with a medical summary plus a support response.
        #[arg(long, default_value_t = false)]
        dual: bool,
        /// Print the retrieved chunks after the answer.
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
    /// One turn of a remembered conversation.
    Chat {
        /// Session to continue; a new one is started when omitted.
        #[arg(short, long, env = "BUDDY_SESSION")]
        session: Option<String>,
        question: String,
    },
    /// Validate configuration, templates, index and backend.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .load()
        .with_context(|| format!("Invalid configuration at {}", config_service.config_path().display()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.app.log_level.clone());
    logging::init(&paths, &level);

    match cli.command {
        Commands::Ingest { input } => {
            let providers = Providers::from_config(&config);
            let summary = api::ingest(&paths, &config, &providers, &input)
                .await
                .with_context(|| format!("Failed to ingest {}", input.display()))?;
            println!(
                "Indexed {} chunk(s) from {} document(s) ({} placeholder(s) skipped, {} empty) into {}",
                summary.indexed,
                summary.report.documents,
                summary.report.skipped_placeholders,
                summary.report.empty_documents,
                paths.index_path.display()
            );
        }
        Commands::Ask {
            question,
            top_k,
            dual,
            show_context,
        } => {
            let state = AppState::initialize(paths.clone()).await?;
            let request = AskRequest { question, top_k };
            let response = if dual {
                api::ask_dual(&state, request).await?
            } else {
                api::ask(&state, request).await?
            };
            println!("{}", response.answer);
            if show_context {
                for (rank, context) in response.retrieved_contexts.iter().enumerate() {
                    println!("\n[{}] {}", rank + 1, context);
                }
            }
        }
        Commands::Chat { session, question } => {
            let session = session.unwrap_or_else(|| {
                let id = uuid::Uuid::new_v4().to_string();
                eprintln!("session: {}", id);
                id
            });
            let state = AppState::initialize(paths.clone()).await?;
            let response = api::chat(
                &state,
                ChatRequest {
                    session_id: session,
                    question,
                },
            )
            .await?;
            println!("{}", response.answer);
        }
        Commands::Check => check(&paths, &config_service, &config).await?,
    }

    Ok(())
}

async fn check(
    paths: &AppPaths,
    config_service: &ConfigService,
    config: &AppConfig,
) -> anyhow::Result<()> {
    println!("config: ok ({})", config_service.config_path().display());

    let redacted = config_service.redact_sensitive_values(&serde_json::to_value(config)?);
    tracing::debug!("Effective config: {}", redacted);

    PromptBuilder::new()
        .and_then(|prompts| prompts.verify())
        .context("Prompt templates failed verification")?;
    println!("templates: ok");

    let repository = IndexRepository::open(&paths.index_path).await?;
    let info = repository.info().await?;
    println!(
        "index: {} entries, dimension {}, embedder {}",
        info.entries,
        info.dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        info.embedder.unwrap_or_else(|| "-".to_string())
    );

    let provider = OpenAiCompatProvider::from_config(&config.provider);
    let reachable = provider.health_check().await;
    println!(
        "backend: {} ({})",
        if reachable { "reachable" } else { "unreachable" },
        config.provider.base_url
    );
    if !reachable && config.provider.embedding_backend == EmbeddingBackend::Remote {
        anyhow::bail!("Embedding backend is remote but {} is unreachable", config.provider.base_url);
    }
    Ok(())
}
