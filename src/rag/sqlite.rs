//! SQLite persistence for the vector index.
//!
//! Chunks are stored in insertion order with their embeddings as
//! little-endian f32 blobs. A small key/value table records the dimension and
//! the embedder that produced the vectors so a reload can refuse to mix
//! embedders.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::index::{IndexEntry, VectorIndex};
use super::ingest::ChunkMetadata;
use crate::core::errors::PipelineError;

const META_DIMENSION: &str = "dimension";
const META_EMBEDDER: &str = "embedder";
const META_BUILT_AT: &str = "built_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub entries: usize,
    pub dimension: Option<usize>,
    pub embedder: Option<String>,
    pub built_at: Option<String>,
}

pub struct IndexRepository {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl IndexRepository {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(PipelineError::storage)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(PipelineError::storage)?;

        let repo = Self { pool, db_path };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_chunks (
                position INTEGER PRIMARY KEY,
                chunk_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                source_url TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>, PipelineError> {
        if bytes.len() % 4 != 0 {
            return Err(PipelineError::Storage(format!(
                "corrupt embedding blob of {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Replace the stored index with `index`, atomically.
    pub async fn save(&self, index: &VectorIndex, embedder: &str) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(PipelineError::storage)?;

        sqlx::query("DELETE FROM index_chunks")
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;

        for (position, entry) in index.entries().iter().enumerate() {
            sqlx::query(
                "INSERT INTO index_chunks
                    (position, chunk_id, document_id, source_url, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(position as i64)
            .bind(&entry.metadata.chunk_id)
            .bind(&entry.metadata.document_id)
            .bind(&entry.metadata.source_url)
            .bind(entry.metadata.chunk_index as i64)
            .bind(&entry.chunk_text)
            .bind(Self::serialize_embedding(&entry.embedding))
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        }

        let mut meta = vec![
            (META_EMBEDDER, embedder.to_string()),
            (META_BUILT_AT, chrono::Utc::now().to_rfc3339()),
        ];
        if let Some(dimension) = index.dimension() {
            meta.push((META_DIMENSION, dimension.to_string()));
        }
        for (key, value) in meta {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(PipelineError::storage)?;
        }

        tx.commit().await.map_err(PipelineError::storage)?;
        tracing::info!(
            "Saved {} index entries to {}",
            index.len(),
            self.db_path.display()
        );
        Ok(())
    }

    async fn meta_value(&self, key: &str) -> Result<Option<String>, PipelineError> {
        let row = sqlx::query("SELECT value FROM index_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn info(&self) -> Result<IndexInfo, PipelineError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM index_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(PipelineError::storage)?
            .get("n");

        let dimension = match self.meta_value(META_DIMENSION).await? {
            Some(raw) => Some(raw.parse::<usize>().map_err(|e| {
                PipelineError::Storage(format!("corrupt dimension '{}': {}", raw, e))
            })?),
            None => None,
        };

        Ok(IndexInfo {
            entries: count.max(0) as usize,
            dimension,
            embedder: self.meta_value(META_EMBEDDER).await?,
            built_at: self.meta_value(META_BUILT_AT).await?,
        })
    }

    /// Load the stored index. When `expected_embedder` is given it must match
    /// the embedder recorded at save time.
    pub async fn load(&self, expected_embedder: Option<&str>) -> Result<VectorIndex, PipelineError> {
        let info = self.info().await?;
        if let (Some(expected), Some(stored)) = (expected_embedder, info.embedder.as_deref()) {
            if expected != stored {
                return Err(PipelineError::Config(format!(
                    "Index at {} was built with embedder '{}' but '{}' is configured; re-run ingest",
                    self.db_path.display(),
                    stored,
                    expected
                )));
            }
        }

        let rows = sqlx::query(
            "SELECT chunk_id, document_id, source_url, chunk_index, content, embedding
             FROM index_chunks ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            let chunk_index: i64 = row.get("chunk_index");
            entries.push(IndexEntry {
                chunk_text: row.get("content"),
                embedding: Self::deserialize_embedding(&blob)?,
                metadata: ChunkMetadata {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    source_url: row.get("source_url"),
                    chunk_index: chunk_index.max(0) as usize,
                },
            });
        }

        let index = VectorIndex::from_entries(entries)?;
        if let (Some(stored), Some(actual)) = (info.dimension, index.dimension()) {
            if stored != actual {
                return Err(PipelineError::Storage(format!(
                    "stored dimension {} does not match entries ({})",
                    stored, actual
                )));
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::Document;
    use tempfile::TempDir;

    fn entry(url: &str, index: usize, text: &str, embedding: Vec<f32>) -> IndexEntry {
        let document = Document::new(url, text);
        IndexEntry {
            chunk_text: text.to_string(),
            embedding,
            metadata: ChunkMetadata::new(&document, index),
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_entries(vec![
            entry("https://example.org/a", 0, "ALS affects motor neurons.", vec![1.0, 0.0, 0.5]),
            entry("https://example.org/a", 1, "Early symptoms include muscle weakness.", vec![0.0, 1.0, -0.25]),
            entry("https://example.org/b", 0, "Clinics help.", vec![0.3, 0.3, 0.3]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn save_then_load_preserves_entries_and_order() {
        let dir = TempDir::new().unwrap();
        let repo = IndexRepository::open(dir.path().join("index.db")).await.unwrap();
        let index = sample_index();

        repo.save(&index, "hashing").await.unwrap();
        let loaded = repo.load(Some("hashing")).await.unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), Some(3));
        for (original, restored) in index.entries().iter().zip(loaded.entries()) {
            assert_eq!(original.chunk_text, restored.chunk_text);
            assert_eq!(original.embedding, restored.embedding);
            assert_eq!(original.metadata, restored.metadata);
        }

        let info = repo.info().await.unwrap();
        assert_eq!(info.entries, 3);
        assert_eq!(info.embedder.as_deref(), Some("hashing"));
        assert!(info.built_at.is_some());
    }

    #[tokio::test]
    async fn saving_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let repo = IndexRepository::open(dir.path().join("index.db")).await.unwrap();

        repo.save(&sample_index(), "hashing").await.unwrap();
        let smaller = VectorIndex::from_entries(vec![entry(
            "https://example.org/c",
            0,
            "only",
            vec![1.0, 1.0],
        )])
        .unwrap();
        repo.save(&smaller, "hashing").await.unwrap();

        let loaded = repo.load(None).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.dimension(), Some(2));
    }

    #[tokio::test]
    async fn embedder_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = IndexRepository::open(dir.path().join("index.db")).await.unwrap();
        repo.save(&sample_index(), "hashing").await.unwrap();

        let err = repo.load(Some("all-minilm-l6-v2")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn fresh_database_loads_empty_index() {
        let dir = TempDir::new().unwrap();
        let repo = IndexRepository::open(dir.path().join("nested/index.db"))
            .await
            .unwrap();

        let loaded = repo.load(Some("hashing")).await.unwrap();
        assert!(loaded.is_empty());
        assert_eq!(repo.info().await.unwrap().entries, 0);
    }

    #[test]
    fn corrupt_blobs_are_reported() {
        assert!(IndexRepository::deserialize_embedding(&[0, 1, 2]).is_err());
        let bytes = IndexRepository::serialize_embedding(&[1.5, -2.0]);
        assert_eq!(
            IndexRepository::deserialize_embedding(&bytes).unwrap(),
            vec![1.5, -2.0]
        );
    }
}
