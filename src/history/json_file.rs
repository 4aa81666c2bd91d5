use std::path::PathBuf;

use async_trait::async_trait;

use super::{validate_session_id, SessionMemory, Turn};
use crate::core::errors::PipelineError;

/// One pretty-printed JSON array of turns per session under `dir`.
///
/// Appends rewrite the whole file through a temporary sibling and a rename,
/// so a crash never leaves a half-written transcript. Callers serialize
/// turns of the same session with [`SessionLocks`](super::SessionLocks).
#[derive(Debug, Clone)]
pub struct JsonFileMemory {
    dir: PathBuf,
}

impl JsonFileMemory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, PipelineError> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl SessionMemory for JsonFileMemory {
    async fn load(&self, session_id: &str) -> Result<Vec<Turn>, PipelineError> {
        let path = self.session_path(session_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(PipelineError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    err
                )))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            PipelineError::Storage(format!("Corrupt memory file {}: {}", path.display(), err))
        })
    }

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), PipelineError> {
        let path = self.session_path(session_id)?;
        let mut turns = self.load(session_id).await?;
        turns.push(turn);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(PipelineError::storage)?;
        let body = serde_json::to_vec_pretty(&turns).map_err(PipelineError::internal)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(PipelineError::storage)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(PipelineError::storage)?;

        tracing::debug!("Session {} now has {} turn(s)", session_id, turns.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let dir = TempDir::new().unwrap();
        let memory = JsonFileMemory::new(dir.path());
        assert!(memory.load("fresh").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_are_ordered_and_persisted() {
        let dir = TempDir::new().unwrap();
        let memory = JsonFileMemory::new(dir.path().join("memory"));

        memory.append("s1", Turn::new("hi", "hello")).await.unwrap();
        memory.append("s1", Turn::new("how?", "fine")).await.unwrap();
        memory.append("s2", Turn::new("other", "session")).await.unwrap();

        let reopened = JsonFileMemory::new(dir.path().join("memory"));
        let turns = reopened.load("s1").await.unwrap();
        let users: Vec<&str> = turns.iter().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["hi", "how?"]);
        assert_eq!(reopened.load("s2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reads_files_without_timestamps() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("legacy.json"),
            r#"[{"user": "q", "bot": "a"}]"#,
        )
        .unwrap();

        let turns = JsonFileMemory::new(dir.path()).load("legacy").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].bot, "a");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        let err = JsonFileMemory::new(dir.path()).load("bad").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[tokio::test]
    async fn rejects_path_like_session_ids() {
        let dir = TempDir::new().unwrap();
        let memory = JsonFileMemory::new(dir.path());
        assert!(matches!(
            memory.append("../escape", Turn::new("a", "b")).await,
            Err(PipelineError::Config(_))
        ));
    }
}
