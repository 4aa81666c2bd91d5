use serde::{Deserialize, Serialize};

use super::defaults::{default_boilerplate, default_empathy_keywords, default_stop_sequences};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub provider: ProviderConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub context: ContextConfig,
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub response: ResponseConfig,
    pub empathy: EmpathyConfig,
    pub intent: IntentConfig,
    pub memory: MemoryConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Remote,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible server (llama.cpp, LM Studio, vLLM, ...).
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    pub embedding_backend: EmbeddingBackend,
    /// Output dimension of the hashing embedder.
    pub hashing_dimension: usize,
    /// Concurrent embedding requests while building the index.
    pub embed_concurrency: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8088".to_string(),
            chat_model: "tinyllama-1.1b-chat".to_string(),
            embedding_model: "all-minilm-l6-v2".to_string(),
            api_key: None,
            embedding_backend: EmbeddingBackend::Remote,
            hashing_dimension: 384,
            embed_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Word budget above which retrieved context is summarized.
    pub token_budget: usize,
    pub boilerplate: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: 250,
            boilerplate: default_boilerplate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub summary_max_new_tokens: u32,
    pub support_max_new_tokens: u32,
    pub intent_max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub stop_sequences: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 280,
            summary_max_new_tokens: 160,
            support_max_new_tokens: 120,
            intent_max_new_tokens: 8,
            temperature: 0.4,
            top_p: 0.9,
            repetition_penalty: 1.22,
            stop_sequences: default_stop_sequences(),
            timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub support_max_lines: usize,
    pub factual_max_chars: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            support_max_lines: 5,
            factual_max_chars: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpathyConfig {
    pub keywords: Vec<String>,
}

impl Default for EmpathyConfig {
    fn default() -> Self {
        Self {
            keywords: default_empathy_keywords(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Llm,
    Rules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Route session turns through the intent classifier before retrieval.
    pub enabled: bool,
    pub classifier: ClassifierKind,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            classifier: ClassifierKind::Llm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of most recent turns rendered into the prompt.
    pub window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { window: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub skip_placeholders: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            skip_placeholders: true,
        }
    }
}
