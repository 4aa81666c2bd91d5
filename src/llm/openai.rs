use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider::{Embedder, Generator};
use super::types::GenerationOptions;
use crate::core::config::ProviderConfig;
use crate::core::errors::PipelineError;

/// Client for OpenAI-compatible completion servers (llama.cpp server,
/// LM Studio, vLLM). Serves both the generation and embedding capabilities.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    chat_model: String,
    embedding_model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            api_key: None,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut provider = Self::new(
            config.base_url.clone(),
            config.chat_model.clone(),
            config.embedding_model.clone(),
        );
        provider.api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        provider
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .post("/v1/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::embedding)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!(
                "embedding server returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(PipelineError::embedding)?;
        let embeddings = parse_embeddings(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, server returned {}",
                inputs.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError> {
        let body = completion_body(&self.chat_model, prompt, options);

        let res = self
            .post("/v1/completions")
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "completion server returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(PipelineError::generation)?;
        payload["choices"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::Generation("completion response had no text".into()))
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.request_embeddings(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| PipelineError::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(inputs).await
    }
}

fn completion_body(model: &str, prompt: &str, options: &GenerationOptions) -> Value {
    let mut body = json!({
        "model": model,
        "prompt": prompt,
        "stream": false,
        "max_tokens": options.max_new_tokens,
        "temperature": options.temperature,
        "top_p": options.top_p,
        "repeat_penalty": options.repetition_penalty,
    });

    if !options.stop_sequences.is_empty() {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("stop".to_string(), json!(options.stop_sequences));
        }
    }

    body
}

fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| PipelineError::Embedding("embedding response had no data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let values = item["embedding"].as_array().ok_or_else(|| {
            PipelineError::Embedding(format!("embedding {} is not an array", position))
        })?;
        let vector: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| {
                PipelineError::Embedding(format!("embedding {} has non-numeric values", position))
            })?;
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
