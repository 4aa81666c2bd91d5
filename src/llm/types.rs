use serde::{Deserialize, Serialize};

use crate::core::config::GenerationConfig;

/// Decoding parameters passed to a [`Generator`](super::Generator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

impl GenerationOptions {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            repetition_penalty: config.repetition_penalty,
            stop_sequences: config.stop_sequences.clone(),
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Per-purpose option sets derived once from configuration.
#[derive(Debug, Clone)]
pub struct GenerationProfiles {
    pub answer: GenerationOptions,
    pub summary: GenerationOptions,
    pub support: GenerationOptions,
    pub intent: GenerationOptions,
}

impl GenerationProfiles {
    pub fn from_config(config: &GenerationConfig) -> Self {
        let answer = GenerationOptions::from_config(config);
        Self {
            summary: answer
                .clone()
                .with_max_new_tokens(config.summary_max_new_tokens),
            support: answer
                .clone()
                .with_max_new_tokens(config.support_max_new_tokens),
            intent: answer
                .clone()
                .with_max_new_tokens(config.intent_max_new_tokens)
                .with_temperature(0.0),
            answer,
        }
    }
}

impl Default for GenerationProfiles {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}
