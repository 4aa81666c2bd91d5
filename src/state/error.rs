use thiserror::Error;

use crate::core::errors::PipelineError;
use crate::graph::GraphError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] PipelineError),

    #[error("Failed to load prompt templates: {0}")]
    Prompts(#[source] PipelineError),

    #[error("Failed to open vector index: {0}")]
    Index(#[source] PipelineError),

    #[error("Failed to build answer graph: {0}")]
    Graph(#[source] GraphError),
}
