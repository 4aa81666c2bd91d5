use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("{operation} timed out after {timeout_ms} ms")]
    GenerationTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("generation error: {0}")]
    Generation(String),
    #[error("template '{template}' is missing a value for slot '{slot}'")]
    MissingSlot { template: String, slot: String },
    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Storage(err.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Embedding(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Generation(err.to_string())
    }

    /// Whether a failed Generator call may be degraded around in a
    /// non-critical stage.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Generation(_) | PipelineError::GenerationTimeout { .. }
        )
    }
}
