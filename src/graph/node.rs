// Node trait and types
// Base abstraction for graph nodes

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{ContextProcessor, PromptBuilder};
use crate::core::config::{AppConfig, ClassifierKind};
use crate::core::errors::PipelineError;
use crate::llm::{GenerationProfiles, Generator};
use crate::rag::Retriever;

use super::state::ConversationState;

/// Tunables read once from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub token_budget: usize,
    pub empathy_keywords: Vec<String>,
    pub support_max_lines: usize,
    pub factual_max_chars: usize,
    pub classifier: ClassifierKind,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            token_budget: config.context.token_budget,
            empathy_keywords: config.empathy.keywords.clone(),
            support_max_lines: config.response.support_max_lines,
            factual_max_chars: config.response.factual_max_chars,
            classifier: config.intent.classifier,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Services shared by every node of a run. Cheap to clone.
#[derive(Clone)]
pub struct NodeContext {
    pub retriever: Retriever,
    pub generator: Arc<dyn Generator>,
    pub prompts: Arc<PromptBuilder>,
    pub processor: ContextProcessor,
    pub profiles: GenerationProfiles,
    pub settings: PipelineSettings,
}

/// Where the turn goes after a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow the default edge, or jump to the named stage.
    Continue(Option<String>),
    /// Follow the edge carrying this label.
    Branch(String),
    /// The turn is answered.
    Final,
}

/// A failed turn: the stage that stopped it, the pipeline failure when there
/// is one, and the stages visited before it.
#[derive(Debug)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    /// Stage ids in visit order, most recent last.
    pub execution_trace: Vec<String>,
    pub cause: Option<PipelineError>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            cause: None,
        }
    }

    pub fn from_pipeline(node_id: impl Into<String>, err: PipelineError) -> Self {
        Self {
            node_id: node_id.into(),
            message: err.to_string(),
            execution_trace: Vec::new(),
            cause: Some(err),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }

    /// The underlying pipeline failure; structural graph faults map to
    /// `Internal`.
    pub fn into_pipeline_error(self) -> PipelineError {
        match self.cause {
            Some(err) => err,
            None => PipelineError::Internal(self.to_string()),
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "stage {} failed: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "stage {} failed after {}: {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl From<GraphError> for PipelineError {
    fn from(err: GraphError) -> Self {
        err.into_pipeline_error()
    }
}

/// One stage of a turn. It takes the state by value and hands back the
/// updated state with its routing decision.
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> &'static str;

    /// Display name for logs; defaults to the id.
    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(
        &self,
        state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError>;
}
