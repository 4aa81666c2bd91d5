//! Retrieval layer: document loading, chunking, embedding and search.
//!
//! - `chunker`: sliding-window splitter with natural breakpoints
//! - `ingest`: documents to chunk records with provenance
//! - `index`: in-memory cosine index
//! - `retriever`: query embedding plus top-k search
//! - `sqlite`: on-disk persistence of a built index

pub mod chunker;
pub mod document;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod sqlite;

pub use chunker::{split, Chunk};
pub use document::{load_documents, parse_documents, Document, RawArticle};
pub use index::{ChunkSearchResult, IndexEntry, VectorIndex};
pub use ingest::{prepare_chunks, ChunkMetadata, IngestReport, SourceChunk};
pub use retriever::Retriever;
pub use sqlite::{IndexInfo, IndexRepository};
