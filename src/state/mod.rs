use std::sync::Arc;
use std::time::Duration;

use crate::context::{ContextProcessor, PromptBuilder};
use crate::core::config::{AppConfig, AppPaths, ConfigService, EmbeddingBackend};
use crate::graph::{NodeContext, Orchestrator, PipelineSettings};
use crate::history::{JsonFileMemory, SessionLocks, SessionMemory};
use crate::llm::{
    Embedder, GenerationProfiles, Generator, HashingEmbedder, OpenAiCompatProvider,
    TimeoutEmbedder, TimeoutGenerator,
};
use crate::rag::{IndexRepository, Retriever, VectorIndex};

pub mod error;

use error::InitializationError;

/// Model capabilities built from configuration, already wrapped in their
/// timeouts.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    /// Recorded with a persisted index; a reload under a different
    /// embedder is refused.
    pub embedder_id: String,
}

impl Providers {
    pub fn from_config(config: &AppConfig) -> Self {
        let remote = Arc::new(OpenAiCompatProvider::from_config(&config.provider));

        let embedder: Arc<dyn Embedder> = match config.provider.embedding_backend {
            EmbeddingBackend::Hashing => {
                Arc::new(HashingEmbedder::new(config.provider.hashing_dimension))
            }
            EmbeddingBackend::Remote => remote.clone(),
        };
        let embedder_id = match config.provider.embedding_backend {
            EmbeddingBackend::Hashing => format!("hashing-{}", config.provider.hashing_dimension),
            EmbeddingBackend::Remote => config.provider.embedding_model.clone(),
        };

        Self::wrap(embedder, remote, embedder_id, config)
    }

    pub fn wrap(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        embedder_id: impl Into<String>,
        config: &AppConfig,
    ) -> Self {
        Self {
            embedder: Arc::new(TimeoutEmbedder::new(
                embedder,
                Duration::from_millis(config.embedding.timeout_ms),
            )),
            generator: Arc::new(TimeoutGenerator::new(
                generator,
                Duration::from_millis(config.generation.timeout_ms),
            )),
            embedder_id: embedder_id.into(),
        }
    }
}

/// Everything a turn needs, shared read-only across requests.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub providers: Providers,
    pub prompts: Arc<PromptBuilder>,
    pub index: Arc<VectorIndex>,
    pub memory: Arc<dyn SessionMemory>,
    pub session_locks: SessionLocks,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Load configuration, open the persisted index and wire the graph.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Self, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load()
            .map_err(InitializationError::Config)?;
        let providers = Providers::from_config(&config);

        let repository = IndexRepository::open(&paths.index_path)
            .await
            .map_err(InitializationError::Index)?;
        let index = repository
            .load(Some(&providers.embedder_id))
            .await
            .map_err(InitializationError::Index)?;
        if index.is_empty() {
            tracing::warn!(
                "Vector index at {} is empty; run `als-buddy ingest` first",
                paths.index_path.display()
            );
        } else {
            tracing::info!("Loaded vector index with {} entries", index.len());
        }

        let memory: Arc<dyn SessionMemory> = Arc::new(JsonFileMemory::new(paths.memory_dir.clone()));
        Self::from_parts(paths, config, providers, index, memory)
    }

    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: AppConfig,
        providers: Providers,
        index: VectorIndex,
        memory: Arc<dyn SessionMemory>,
    ) -> Result<Self, InitializationError> {
        let prompts = Arc::new(PromptBuilder::new().map_err(InitializationError::Prompts)?);
        prompts.verify().map_err(InitializationError::Prompts)?;

        let index = Arc::new(index);
        let profiles = GenerationProfiles::from_config(&config.generation);
        let ctx = NodeContext {
            retriever: Retriever::new(index.clone(), providers.embedder.clone()),
            generator: providers.generator.clone(),
            prompts: prompts.clone(),
            processor: ContextProcessor::new(
                providers.generator.clone(),
                prompts.clone(),
                config.context.boilerplate.clone(),
                profiles.summary.clone(),
            ),
            profiles,
            settings: PipelineSettings::from_config(&config),
        };
        let orchestrator = Arc::new(Orchestrator::new(ctx).map_err(InitializationError::Graph)?);

        Ok(Self {
            paths,
            config: Arc::new(config),
            providers,
            prompts,
            index,
            memory,
            session_locks: SessionLocks::new(),
            orchestrator,
        })
    }
}
