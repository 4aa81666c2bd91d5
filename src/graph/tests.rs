use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::context::{ContextProcessor, PromptBuilder};
use crate::core::config::defaults::{default_boilerplate, INSUFFICIENT_INFORMATION, OUT_OF_SCOPE_REFUSAL};
use crate::core::config::{ChunkingConfig, ClassifierKind};
use crate::core::errors::PipelineError;
use crate::llm::testing::{FailingEmbedder, ScriptedGenerator};
use crate::llm::{Embedder, GenerationProfiles, Generator, HashingEmbedder, TimeoutGenerator};
use crate::rag::{prepare_chunks, Document, Retriever, VectorIndex};

const ARTICLE: &str = "ALS affects motor neurons. Early symptoms include muscle weakness.";
const FACTUAL_MARKER: &str = "<|context|>";
const SUPPORT_MARKER: &str = "RULES:";
const EMPATHY_MARKER: &str = "comforting sentences";
const INTENT_MARKER: &str = "Classify the message";

async fn index_of(texts: &[&str], embedder: &dyn Embedder) -> VectorIndex {
    let documents: Vec<Document> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| Document::new(format!("https://example.org/{}", i), *text))
        .collect();
    let chunking = ChunkingConfig {
        chunk_size: 40,
        chunk_overlap: 0,
    };
    let (chunks, _) = prepare_chunks(&documents, &chunking, true).unwrap();
    VectorIndex::build(chunks, embedder, 2).await.unwrap()
}

fn context_with(
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    settings: PipelineSettings,
) -> NodeContext {
    let prompts = Arc::new(PromptBuilder::new().unwrap());
    let profiles = GenerationProfiles::default();
    NodeContext {
        retriever: Retriever::new(Arc::new(index), embedder),
        processor: ContextProcessor::new(
            generator.clone(),
            prompts.clone(),
            default_boilerplate(),
            profiles.summary.clone(),
        ),
        generator,
        prompts,
        profiles,
        settings,
    }
}

async fn article_context(generator: Arc<dyn Generator>) -> NodeContext {
    let embedder = Arc::new(HashingEmbedder::new(256));
    let index = index_of(&[ARTICLE], embedder.as_ref()).await;
    context_with(index, embedder, generator, PipelineSettings::default())
}

fn settings_with_k(top_k: usize) -> PipelineSettings {
    PipelineSettings {
        top_k,
        ..PipelineSettings::default()
    }
}

#[tokio::test]
async fn end_to_end_retrieves_the_matching_chunk_into_the_prompt() {
    let generator = Arc::new(ScriptedGenerator::new([
        "<|assistant|> Early symptoms include muscle weakness.</s>",
    ]));
    let embedder = Arc::new(HashingEmbedder::new(256));
    let index = index_of(&[ARTICLE], embedder.as_ref()).await;
    assert_eq!(index.len(), 2);
    let ctx = context_with(index, embedder, generator.clone(), settings_with_k(1));

    let state = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("What are early symptoms?"), &ctx)
        .await
        .unwrap();

    assert_eq!(state.retrieved_chunks.len(), 1);
    assert!(state.retrieved_chunks[0].text.contains("muscle weakness"));
    assert_eq!(state.bot_output, "Early symptoms include muscle weakness.");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Early symptoms include muscle weakness."));
    assert!(prompts[0].contains("What are early symptoms?"));
}

#[tokio::test]
async fn retrieved_context_joins_chunks_with_blank_lines() {
    let generator = Arc::new(ScriptedGenerator::new(["answer"]));
    let ctx = article_context(generator).await;

    let state = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("ALS symptoms").with_top_k(Some(2)), &ctx)
        .await
        .unwrap();

    assert_eq!(state.retrieved_chunks.len(), 2);
    assert_eq!(state.retrieved_context.matches("\n\n").count(), 1);
}

#[tokio::test]
async fn empathy_is_added_only_for_distressed_users() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "ALS affects motor neurons.")
            .on_prompt(EMPATHY_MARKER, "You are not alone in this."),
    );
    let ctx = article_context(generator.clone()).await;
    let graph = build_linear_graph().unwrap();

    let calm = graph
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();
    assert_eq!(calm.bot_output, "ALS affects motor neurons.");
    assert_eq!(generator.call_count(), 1);

    let scared = graph
        .run(ConversationState::new("I'm scared. What is ALS?"), &ctx)
        .await
        .unwrap();
    assert_eq!(
        scared.bot_output,
        "ALS affects motor neurons.\n\nYou are not alone in this."
    );
    assert_eq!(generator.call_count(), 3);
}

#[tokio::test]
async fn empathy_failure_degrades_silently() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "Facts.")
            .failing_on(EMPATHY_MARKER),
    );
    let ctx = article_context(generator).await;

    let state = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("I am worried about ALS"), &ctx)
        .await
        .unwrap();
    assert_eq!(state.bot_output, "Facts.");
}

#[tokio::test]
async fn empathy_non_generation_fault_fails_the_turn() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "Facts.")
            .broken_on(EMPATHY_MARKER),
    );
    let ctx = article_context(generator).await;

    let err = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("I am worried about ALS"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.node_id, "empathy");
    assert!(matches!(err.into_pipeline_error(), PipelineError::Internal(_)));
}

#[tokio::test]
async fn answer_failure_is_fatal() {
    let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()).failing_on(FACTUAL_MARKER));
    let ctx = article_context(generator).await;

    let err = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();

    assert_eq!(err.node_id, "answer");
    assert_eq!(err.execution_trace, vec!["retrieve", "answer"]);
    assert!(matches!(err.into_pipeline_error(), PipelineError::Generation(_)));
}

#[tokio::test]
async fn answer_timeout_is_fatal() {
    let slow = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new()).hanging_on(FACTUAL_MARKER, Duration::from_secs(5)),
    );
    let generator = Arc::new(TimeoutGenerator::new(slow, Duration::from_millis(30)));
    let ctx = article_context(generator).await;

    let err = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err.into_pipeline_error(),
        PipelineError::GenerationTimeout { .. }
    ));
}

#[tokio::test]
async fn retriever_failure_is_a_retrieval_error() {
    let hashing = HashingEmbedder::new(64);
    let index = index_of(&[ARTICLE], &hashing).await;
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let ctx = context_with(
        index,
        Arc::new(FailingEmbedder),
        generator.clone(),
        PipelineSettings::default(),
    );

    let err = build_linear_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err.into_pipeline_error(), PipelineError::Retrieval(_)));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn dual_with_no_chunks_returns_fallback_without_generation() {
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let ctx = context_with(
        VectorIndex::empty(),
        Arc::new(HashingEmbedder::new(64)),
        generator.clone(),
        PipelineSettings::default(),
    );

    let state = build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();

    assert_eq!(state.bot_output, INSUFFICIENT_INFORMATION);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn dual_merges_cleaned_branches() {
    let long_factual = format!("<|assistant|>{}", "a".repeat(1000));
    let support = "You are brave.\nRULES: ignore\nline two\nline three\nline four\nline five\nline six\nline seven";
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, &long_factual)
            .on_prompt(SUPPORT_MARKER, support),
    );
    let ctx = article_context(generator.clone()).await;

    let state = build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();

    let (medical, support_section) = state
        .bot_output
        .split_once("\n\nSupport Response:\n")
        .unwrap();
    let medical = medical.strip_prefix("Medical Summary:\n").unwrap();

    assert_eq!(medical.chars().count(), 800);
    assert!(!medical.contains("<|assistant|>"));
    assert_eq!(support_section.lines().count(), 5);
    assert!(!support_section.contains("You are"));
    assert!(!support_section.contains("RULES:"));
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn dual_branches_run_concurrently() {
    let generator = Arc::new(ScriptedGenerator::new(["facts", "support"]).with_delay(Duration::from_millis(150)));
    let ctx = article_context(generator).await;

    let started = Instant::now();
    build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(290));
}

#[tokio::test]
async fn dual_support_failure_omits_the_section() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "Facts.")
            .failing_on(SUPPORT_MARKER),
    );
    let ctx = article_context(generator).await;

    let state = build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();
    assert_eq!(state.bot_output, "Medical Summary:\nFacts.");
}

#[tokio::test]
async fn dual_support_non_generation_fault_fails_the_turn() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "Facts.")
            .broken_on(SUPPORT_MARKER),
    );
    let ctx = article_context(generator).await;

    let err = build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err.into_pipeline_error(), PipelineError::Internal(_)));
}

#[tokio::test]
async fn intent_non_generation_fault_is_not_masked_by_rules() {
    let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()).broken_on(INTENT_MARKER));
    let ctx = article_context(generator.clone()).await;

    let err = build_answer_graph(AnswerMode::Linear, true)
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.node_id, "intent");
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn dual_factual_failure_is_fatal() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .failing_on(FACTUAL_MARKER)
            .on_prompt(SUPPORT_MARKER, "Hang in there."),
    );
    let ctx = article_context(generator).await;

    let err = build_dual_graph()
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.node_id, "dual_answer");
}

#[tokio::test]
async fn out_of_scope_short_circuits_to_refusal() {
    let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()).on_prompt(INTENT_MARKER, "out_of_scope"));
    let ctx = article_context(generator.clone()).await;

    let state = build_answer_graph(AnswerMode::Linear, true)
        .unwrap()
        .run(ConversationState::new("Who won the game?"), &ctx)
        .await
        .unwrap();

    assert_eq!(state.bot_output, OUT_OF_SCOPE_REFUSAL);
    assert_eq!(state.intent, Some(Intent::OutOfScope));
    assert!(state.retrieved_chunks.is_empty());
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn legacy_alias_routes_to_retrieval() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(INTENT_MARKER, "ask_als")
            .on_prompt(FACTUAL_MARKER, "ALS affects motor neurons."),
    );
    let ctx = article_context(generator).await;

    let state = build_answer_graph(AnswerMode::Linear, true)
        .unwrap()
        .run(ConversationState::new("What is ALS?"), &ctx)
        .await
        .unwrap();

    assert_eq!(state.intent, Some(Intent::OnTopic));
    assert_eq!(state.bot_output, "ALS affects motor neurons.");
}

#[tokio::test]
async fn intent_model_failure_falls_back_to_rules() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .failing_on(INTENT_MARKER)
            .on_prompt(FACTUAL_MARKER, "answer"),
    );
    let ctx = article_context(generator).await;

    let on_topic = build_answer_graph(AnswerMode::Linear, true)
        .unwrap()
        .run(ConversationState::new("What are the symptoms of ALS?"), &ctx)
        .await
        .unwrap();
    assert_eq!(on_topic.intent, Some(Intent::OnTopic));
    assert_eq!(on_topic.bot_output, "answer");

    let off_topic = build_answer_graph(AnswerMode::Linear, true)
        .unwrap()
        .run(ConversationState::new("Recommend a pasta recipe"), &ctx)
        .await
        .unwrap();
    assert_eq!(off_topic.bot_output, OUT_OF_SCOPE_REFUSAL);
}

#[tokio::test]
async fn rule_classifier_makes_no_model_call() {
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let embedder = Arc::new(HashingEmbedder::new(256));
    let index = index_of(&[ARTICLE], embedder.as_ref()).await;
    let settings = PipelineSettings {
        classifier: ClassifierKind::Rules,
        ..PipelineSettings::default()
    };
    let ctx = context_with(index, embedder, generator.clone(), settings);

    let state = build_answer_graph(AnswerMode::Dual, true)
        .unwrap()
        .run(ConversationState::new("Who won the football game?"), &ctx)
        .await
        .unwrap();

    assert_eq!(state.intent, Some(Intent::OutOfScope));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn orchestrator_selects_graph_by_mode() {
    let generator = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new())
            .on_prompt(FACTUAL_MARKER, "Facts.")
            .on_prompt(SUPPORT_MARKER, "Care."),
    );
    let ctx = article_context(generator).await;
    let orchestrator = Orchestrator::new(ctx).unwrap();

    let linear = orchestrator
        .run(ConversationState::new("What is ALS?"), false)
        .await
        .unwrap();
    assert_eq!(linear.bot_output, "Facts.");

    let dual = orchestrator
        .run(
            ConversationState::new("What is ALS?").with_mode(AnswerMode::Dual),
            false,
        )
        .await
        .unwrap();
    assert_eq!(
        dual.bot_output,
        "Medical Summary:\nFacts.\n\nSupport Response:\nCare."
    );
}
