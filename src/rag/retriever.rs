use std::sync::Arc;

use super::index::{ChunkSearchResult, VectorIndex};
use crate::core::errors::PipelineError;
use crate::llm::Embedder;

/// Query-side view of an index: embeds the question with the same embedder
/// that built the index and returns the nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub async fn query(
        &self,
        text: &str,
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, PipelineError> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(text).await.map_err(|err| match err {
            PipelineError::GenerationTimeout { .. } | PipelineError::Embedding(_) => err,
            other => PipelineError::Embedding(other.to_string()),
        })?;

        let results = self
            .index
            .search(&query_embedding, k)
            .map_err(|err| match err {
                PipelineError::Embedding(_) => err,
                other => PipelineError::Retrieval(other.to_string()),
            })?;

        tracing::debug!(
            "Retrieved {} chunk(s) for query ({} chars)",
            results.len(),
            text.chars().count()
        );
        Ok(results)
    }
}
