use super::types::AppConfig;
use crate::core::errors::PipelineError;

pub fn validate_config(config: &AppConfig) -> Result<(), PipelineError> {
    validate_non_empty("provider.base_url", &config.provider.base_url)?;
    validate_non_empty("provider.chat_model", &config.provider.chat_model)?;
    validate_non_empty("provider.embedding_model", &config.provider.embedding_model)?;
    validate_range(
        "provider.hashing_dimension",
        config.provider.hashing_dimension as u64,
        8,
        65_536,
    )?;
    validate_range(
        "provider.embed_concurrency",
        config.provider.embed_concurrency as u64,
        1,
        64,
    )?;

    validate_range(
        "chunking.chunk_size",
        config.chunking.chunk_size as u64,
        1,
        100_000,
    )?;
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(PipelineError::Config(format!(
            "Invalid config at 'chunking.chunk_overlap': must be smaller than chunk_size ({})",
            config.chunking.chunk_size
        )));
    }

    validate_range("retrieval.top_k", config.retrieval.top_k as u64, 1, 100)?;
    validate_range(
        "context.token_budget",
        config.context.token_budget as u64,
        1,
        100_000,
    )?;
    for (index, fragment) in config.context.boilerplate.iter().enumerate() {
        validate_non_empty(&format!("context.boilerplate[{}]", index), fragment)?;
    }

    let generation = &config.generation;
    for (path, value) in [
        ("generation.max_new_tokens", generation.max_new_tokens),
        (
            "generation.summary_max_new_tokens",
            generation.summary_max_new_tokens,
        ),
        (
            "generation.support_max_new_tokens",
            generation.support_max_new_tokens,
        ),
        (
            "generation.intent_max_new_tokens",
            generation.intent_max_new_tokens,
        ),
    ] {
        validate_range(path, value as u64, 1, 32_768)?;
    }
    validate_float("generation.temperature", generation.temperature, 0.0, 2.0)?;
    validate_float("generation.top_p", generation.top_p, 0.0, 1.0)?;
    validate_float(
        "generation.repetition_penalty",
        generation.repetition_penalty,
        0.5,
        3.0,
    )?;
    validate_range("generation.timeout_ms", generation.timeout_ms, 1, 3_600_000)?;
    validate_range(
        "embedding.timeout_ms",
        config.embedding.timeout_ms,
        1,
        3_600_000,
    )?;

    validate_range(
        "response.support_max_lines",
        config.response.support_max_lines as u64,
        1,
        100,
    )?;
    validate_range(
        "response.factual_max_chars",
        config.response.factual_max_chars as u64,
        1,
        1_000_000,
    )?;

    for (index, keyword) in config.empathy.keywords.iter().enumerate() {
        validate_non_empty(&format!("empathy.keywords[{}]", index), keyword)?;
    }

    validate_range("memory.window", config.memory.window as u64, 0, 1_000)?;

    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), PipelineError> {
    if value < min || value > max {
        return Err(PipelineError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_float(path: &str, value: f32, min: f32, max: f32) -> Result<(), PipelineError> {
    if !value.is_finite() || value < min || value > max {
        return Err(PipelineError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}
