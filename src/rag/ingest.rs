//! Turns loaded documents into chunk records ready for embedding.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::chunker::{split, Chunk};
use super::document::Document;
use crate::core::config::ChunkingConfig;
use crate::core::errors::PipelineError;

/// Provenance stored next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_id: String,
    pub document_id: String,
    pub source_url: String,
    pub chunk_index: usize,
}

impl ChunkMetadata {
    pub fn new(document: &Document, chunk_index: usize) -> Self {
        Self {
            chunk_id: chunk_id(&document.source_url, chunk_index),
            document_id: document.id.clone(),
            source_url: document.source_url.clone(),
            chunk_index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceChunk {
    pub chunk: Chunk,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub skipped_placeholders: usize,
    pub empty_documents: usize,
    pub chunks: usize,
}

pub fn chunk_id(source_url: &str, chunk_index: usize) -> String {
    let digest = Sha256::digest(format!("{}#{}", source_url, chunk_index).as_bytes());
    hex::encode(digest)
}

/// Chunk every document, in input order.
///
/// Placeholder documents are skipped when `skip_placeholders` is set and
/// otherwise chunked like any other text. Documents that produce no chunks
/// are counted and dropped.
pub fn prepare_chunks(
    documents: &[Document],
    chunking: &ChunkingConfig,
    skip_placeholders: bool,
) -> Result<(Vec<SourceChunk>, IngestReport), PipelineError> {
    let mut report = IngestReport {
        documents: documents.len(),
        ..IngestReport::default()
    };
    let mut prepared = Vec::new();

    for document in documents {
        if skip_placeholders && document.is_placeholder() {
            tracing::info!("Skipping placeholder document {}", document.source_url);
            report.skipped_placeholders += 1;
            continue;
        }

        let chunks = split(
            &document.raw_text,
            chunking.chunk_size,
            chunking.chunk_overlap,
        )?;
        if chunks.is_empty() {
            tracing::debug!("Document {} produced no chunks", document.source_url);
            report.empty_documents += 1;
            continue;
        }

        prepared.extend(chunks.into_iter().map(|chunk| SourceChunk {
            metadata: ChunkMetadata::new(document, chunk.index),
            chunk,
        }));
    }

    report.chunks = prepared.len();
    Ok((prepared, report))
}
