//! Per-session conversation memory.

mod json_file;
mod locks;

pub use json_file::JsonFileMemory;
pub use locks::{SessionGuard, SessionLocks};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// One completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub bot: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only transcript store keyed by session id.
#[async_trait]
pub trait SessionMemory: Send + Sync {
    /// Every turn of the session, oldest first. Unknown sessions are empty.
    async fn load(&self, session_id: &str) -> Result<Vec<Turn>, PipelineError>;

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), PipelineError>;
}

/// Render the last `window` turns as `User: ...\nBot: ...` lines.
pub fn render_memory(turns: &[Turn], window: usize) -> String {
    let skip = turns.len().saturating_sub(window);
    turns[skip..]
        .iter()
        .map(|turn| format!("User: {}\nBot: {}", turn.user.trim(), turn.bot.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Session ids become file names, so only a conservative alphabet is allowed.
pub fn validate_session_id(session_id: &str) -> Result<(), PipelineError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PipelineError::Config(format!(
            "Invalid session id '{}': use 1-128 characters from [A-Za-z0-9_-]",
            session_id
        )))
    }
}
