//! Retrieved-context cleanup before it reaches the answer prompt.

use std::collections::HashSet;
use std::sync::Arc;

use super::prompt::{PromptBuilder, SUMMARIZE};
use crate::core::errors::PipelineError;
use crate::llm::{GenerationOptions, Generator};

/// Non-empty trimmed lines in first-seen order, exact duplicates dropped.
pub fn dedupe_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove every boilerplate literal wherever it occurs, then trim.
pub fn clean(text: &str, boilerplate: &[String]) -> String {
    let mut cleaned = text.to_string();
    for literal in boilerplate.iter().filter(|b| !b.is_empty()) {
        cleaned = cleaned.replace(literal.as_str(), "");
    }
    cleaned.trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Clone)]
pub struct ContextProcessor {
    generator: Arc<dyn Generator>,
    prompts: Arc<PromptBuilder>,
    boilerplate: Vec<String>,
    options: GenerationOptions,
}

impl ContextProcessor {
    pub fn new(
        generator: Arc<dyn Generator>,
        prompts: Arc<PromptBuilder>,
        boilerplate: Vec<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            generator,
            prompts,
            boilerplate,
            options,
        }
    }

    /// Dedupe, clean, and summarize when the cleaned text exceeds
    /// `token_budget` words.
    ///
    /// A failed or timed-out summarization falls back to the cleaned text.
    pub async fn process(&self, raw_context: &str, token_budget: usize) -> Result<String, PipelineError> {
        let cleaned = clean(&dedupe_lines(raw_context), &self.boilerplate);
        let words = word_count(&cleaned);
        if words <= token_budget {
            return Ok(cleaned);
        }

        let prompt = self.prompts.build(SUMMARIZE, &[("context", &cleaned)])?;
        match self.generator.generate(&prompt, &self.options).await {
            Ok(summary) => {
                let summary = summary.trim();
                if summary.is_empty() {
                    tracing::warn!("Summarizer returned nothing; using cleaned context");
                    return Ok(cleaned);
                }
                tracing::debug!("Summarized context from {} words", words);
                Ok(summary.to_string())
            }
            Err(err) if err.is_generation_failure() => {
                tracing::warn!("Context summarization failed, using cleaned context: {}", err);
                Ok(cleaned)
            }
            Err(err) => Err(err),
        }
    }
}
