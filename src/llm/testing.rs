//! Deterministic capability stubs shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{Embedder, Generator};
use super::types::GenerationOptions;
use crate::core::errors::PipelineError;

enum Reply {
    Text(String),
    Fail(String),
    Broken(String),
    Hang(Duration),
}

/// Generator that replays scripted responses and records every prompt.
///
/// Rules registered with `on_prompt`, `failing_on`, `broken_on` or `hanging_on` match by
/// substring and win over the queue; the queue is consumed in call order and
/// `"ok"` is returned once it runs dry.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<String>>,
    rules: Vec<(String, Reply)>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(responses.into_iter().map(Into::into).collect()),
            rules: Vec::new(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn on_prompt(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(response.to_string())));
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Reply::Fail(format!("scripted failure for '{}'", needle)),
        ));
        self
    }

    /// Matching prompts fail with a non-generation error, as a programming
    /// fault would.
    pub fn broken_on(mut self, needle: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Reply::Broken(format!("scripted fault for '{}'", needle)),
        ));
        self
    }

    pub fn hanging_on(mut self, needle: &str, duration: Duration) -> Self {
        self.rules.push((needle.to_string(), Reply::Hang(duration)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        for (needle, reply) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return match reply {
                    Reply::Text(text) => Ok(text.clone()),
                    Reply::Fail(message) => Err(PipelineError::Generation(message.clone())),
                    Reply::Broken(message) => Err(PipelineError::Internal(message.clone())),
                    Reply::Hang(duration) => {
                        tokio::time::sleep(*duration).await;
                        Ok("too late".to_string())
                    }
                };
            }
        }

        Ok(self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string()))
    }
}

/// Embedder that always fails, for error-path tests.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
        Err(PipelineError::Embedding("embedder unreachable".into()))
    }
}

/// Embedder whose output length grows with the input, violating the fixed
/// dimension invariant.
pub struct RaggedEmbedder;

#[async_trait]
impl Embedder for RaggedEmbedder {
    fn name(&self) -> &str {
        "ragged"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(vec![1.0; text.split_whitespace().count().max(1)])
    }
}

/// Embedder that sleeps before every call, for timeout tests.
pub struct StalledEmbedder(pub Duration);

#[async_trait]
impl Embedder for StalledEmbedder {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
        tokio::time::sleep(self.0).await;
        Ok(vec![1.0, 0.0])
    }
}
