use async_trait::async_trait;

use super::types::GenerationOptions;
use crate::core::errors::PipelineError;

/// Maps text to a fixed-length vector. The same instance must be used to
/// build an index and to query it.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Declared output dimension, when the backend knows it up front.
    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// Embed several inputs; results are in input order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for input in inputs {
            vectors.push(self.embed(input).await?);
        }
        Ok(vectors)
    }
}

/// Produces text for a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError>;
}
