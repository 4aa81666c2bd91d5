//! Timeout wrappers for the model capabilities.
//!
//! Every external model call in the pipeline goes through one of these, so
//! a hung backend surfaces as `PipelineError::GenerationTimeout` instead of
//! blocking the turn.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{Embedder, Generator};
use super::types::GenerationOptions;
use crate::core::errors::PipelineError;

async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    future: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} exceeded {:?}", operation, timeout);
            Err(PipelineError::GenerationTimeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

pub struct TimeoutGenerator {
    inner: Arc<dyn Generator>,
    timeout: Duration,
}

impl TimeoutGenerator {
    pub fn new(inner: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Generator for TimeoutGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError> {
        with_timeout(
            "generate",
            self.timeout,
            self.inner.generate(prompt, options),
        )
        .await
    }
}

pub struct TimeoutEmbedder {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Embedder for TimeoutEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        with_timeout("embed", self.timeout, self.inner.embed(text)).await
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        with_timeout("embed", self.timeout, self.inner.embed_batch(inputs)).await
    }
}
