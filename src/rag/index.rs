//! In-memory exact nearest-neighbour index.
//!
//! Similarity is cosine, computed in f32 against every entry. The index is
//! append-only while building and read-only afterwards; share it behind an
//! `Arc` for concurrent queries.

use std::cmp::Ordering;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use super::ingest::{ChunkMetadata, SourceChunk};
use crate::core::errors::PipelineError;
use crate::llm::Embedder;

const EMBED_BATCH_SIZE: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity (higher = better).
    pub score: f32,
    /// Insertion position of the entry in the index.
    pub position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Embed every chunk and store it, preserving chunk order.
    ///
    /// Batches are embedded with up to `concurrency` requests in flight.
    pub async fn build(
        chunks: Vec<SourceChunk>,
        embedder: &dyn Embedder,
        concurrency: usize,
    ) -> Result<Self, PipelineError> {
        if chunks.is_empty() {
            return Ok(Self::empty());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.chunk.text.clone()).collect();
        let batches: Vec<Vec<String>> = texts
            .chunks(EMBED_BATCH_SIZE)
            .map(|batch| batch.to_vec())
            .collect();

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|batch| async move {
                let vectors = embedder.embed_batch(&batch).await.map_err(|err| match err {
                    PipelineError::Embedding(_) => err,
                    other => PipelineError::Embedding(other.to_string()),
                })?;
                if vectors.len() != batch.len() {
                    return Err(PipelineError::Embedding(format!(
                        "embedder returned {} vectors for {} inputs",
                        vectors.len(),
                        batch.len()
                    )));
                }
                Ok(vectors)
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        let mut index = Self {
            entries: Vec::with_capacity(chunks.len()),
            dimension: embedder.dimension(),
        };
        for (source, embedding) in chunks.into_iter().zip(embedded.into_iter().flatten()) {
            index.push(IndexEntry {
                chunk_text: source.chunk.text,
                embedding,
                metadata: source.metadata,
            })?;
        }

        tracing::info!(
            "Built index with {} entries (dimension {:?}, embedder {})",
            index.len(),
            index.dimension,
            embedder.name()
        );
        Ok(index)
    }

    /// Rebuild an index from stored entries, re-checking the dimension invariant.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self, PipelineError> {
        let mut index = Self::empty();
        for entry in entries {
            index.push(entry)?;
        }
        Ok(index)
    }

    fn push(&mut self, entry: IndexEntry) -> Result<(), PipelineError> {
        let len = entry.embedding.len();
        if len == 0 {
            return Err(PipelineError::Embedding(format!(
                "empty embedding for chunk {}",
                entry.metadata.chunk_id
            )));
        }
        match self.dimension {
            Some(expected) if expected != len => {
                return Err(PipelineError::Embedding(format!(
                    "embedding dimension {} does not match index dimension {}",
                    len, expected
                )));
            }
            Some(_) => {}
            None => self.dimension = Some(len),
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Top-`k` entries by cosine similarity; ties keep insertion order.
    ///
    /// `k` is clamped to the index size. An empty index or `k == 0` yields
    /// an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkSearchResult>, PipelineError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(PipelineError::Embedding(format!(
                    "query dimension {} does not match index dimension {}",
                    query.len(),
                    expected
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.embedding)))
            .collect();

        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(Ordering::Equal)
                .then(left.0.cmp(&right.0))
        });
        scored.truncate(k.min(self.entries.len()));

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &self.entries[position];
                ChunkSearchResult {
                    text: entry.chunk_text.clone(),
                    metadata: entry.metadata.clone(),
                    score,
                    position,
                }
            })
            .collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON || !dot.is_finite() {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}
