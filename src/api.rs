//! Library surface for callers (CLI, an HTTP layer): ingestion and the three
//! query entry points.
//!
//! Pipeline failures never reach the caller as errors: they are logged and
//! replaced with a fixed apology. `Err` is reserved for malformed requests.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::defaults::GENERIC_APOLOGY;
use crate::core::config::{AppConfig, AppPaths};
use crate::core::errors::PipelineError;
use crate::graph::{AnswerMode, ConversationState, Intent};
use crate::history::{render_memory, validate_session_id, Turn};
use crate::rag::{load_documents, prepare_chunks, IndexRepository, IngestReport, VectorIndex};
use crate::state::{AppState, Providers};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub retrieved_contexts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub intent: Option<Intent>,
}

fn validate_question(question: &str) -> Result<(), PipelineError> {
    if question.trim().is_empty() {
        return Err(PipelineError::Config("question must not be empty".into()));
    }
    Ok(())
}

fn apology_for(err: &PipelineError) -> String {
    tracing::error!("Answering failed: {}", err);
    GENERIC_APOLOGY.to_string()
}

async fn answer(state: &AppState, request: AskRequest, mode: AnswerMode) -> Result<AskResponse, PipelineError> {
    validate_question(&request.question)?;

    let turn = ConversationState::new(request.question.trim())
        .with_top_k(request.top_k)
        .with_mode(mode);

    match state.orchestrator.run(turn, false).await {
        Ok(done) => Ok(AskResponse {
            retrieved_contexts: done.retrieved_texts(),
            answer: done.bot_output,
        }),
        Err(err) => Ok(AskResponse {
            answer: apology_for(&err),
            retrieved_contexts: Vec::new(),
        }),
    }
}

/// Linear flow: retrieve, answer, optional empathy addendum.
pub async fn ask(state: &AppState, request: AskRequest) -> Result<AskResponse, PipelineError> {
    answer(state, request, AnswerMode::Linear).await
}

/// Dual flow: factual summary and support reply in one formatted answer.
pub async fn ask_dual(state: &AppState, request: AskRequest) -> Result<AskResponse, PipelineError> {
    answer(state, request, AnswerMode::Dual).await
}

/// Session turn with memory and, when enabled, intent routing.
///
/// The session lock is held from loading the transcript until the new turn
/// is appended, so concurrent turns of one session are serialized.
pub async fn chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, PipelineError> {
    validate_session_id(&request.session_id)?;
    validate_question(&request.question)?;
    let question = request.question.trim();

    let _guard = state.session_locks.acquire(&request.session_id).await;

    let memory = match state.memory.load(&request.session_id).await {
        Ok(turns) => render_memory(&turns, state.config.memory.window),
        Err(err) => {
            return Ok(ChatResponse {
                answer: apology_for(&err),
                intent: None,
            })
        }
    };

    let turn = ConversationState::new(question).with_session(request.session_id.as_str(), memory);
    let done = match state
        .orchestrator
        .run(turn, state.config.intent.enabled)
        .await
    {
        Ok(done) => done,
        Err(err) => {
            return Ok(ChatResponse {
                answer: apology_for(&err),
                intent: None,
            })
        }
    };

    if done.intent != Some(Intent::OutOfScope) {
        if let Err(err) = state
            .memory
            .append(&request.session_id, Turn::new(question, done.bot_output.as_str()))
            .await
        {
            tracing::warn!("Failed to record turn for session {}: {}", request.session_id, err);
        }
    }

    Ok(ChatResponse {
        answer: done.bot_output,
        intent: done.intent,
    })
}

/// Result of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub report: IngestReport,
    pub indexed: usize,
    pub dimension: Option<usize>,
}

/// Load scraped articles, chunk and embed them, and replace the persisted
/// index.
pub async fn ingest(
    paths: &AppPaths,
    config: &AppConfig,
    providers: &Providers,
    input: &Path,
) -> Result<IngestSummary, PipelineError> {
    let documents = load_documents(input)?;
    tracing::info!("Loaded {} document(s) from {}", documents.len(), input.display());

    let (chunks, report) = prepare_chunks(&documents, &config.chunking, config.ingest.skip_placeholders)?;
    let index = VectorIndex::build(
        chunks,
        providers.embedder.as_ref(),
        config.provider.embed_concurrency,
    )
    .await?;

    let repository = IndexRepository::open(&paths.index_path).await?;
    repository.save(&index, &providers.embedder_id).await?;

    Ok(IngestSummary {
        report,
        indexed: index.len(),
        dimension: index.dimension(),
    })
}
