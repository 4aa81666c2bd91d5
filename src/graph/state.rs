// Graph State
// ConversationState threaded through every node of one turn

use serde::{Deserialize, Serialize};

use crate::rag::ChunkSearchResult;

/// Which answer shape a turn produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// retrieve, answer, optional empathy addendum
    #[default]
    Linear,
    /// retrieve once, factual and support branches in parallel
    Dual,
}

/// Coarse classification of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    OnTopic,
    Personal,
    OutOfScope,
}

impl Intent {
    /// Normalize free-form classifier output: trimmed, lowercased, first
    /// token, surrounding punctuation stripped. `ask_als` is an accepted
    /// alias of `on_topic`; anything unrecognized is out of scope.
    pub fn from_label(raw: &str) -> Self {
        let first = raw
            .trim()
            .to_lowercase()
            .split_whitespace()
            .next()
            .map(|token| {
                token
                    .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
                    .to_string()
            })
            .unwrap_or_default();

        match first.as_str() {
            "on_topic" | "ask_als" => Intent::OnTopic,
            "personal" => Intent::Personal,
            _ => Intent::OutOfScope,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::OnTopic => "on_topic",
            Intent::Personal => "personal",
            Intent::OutOfScope => "out_of_scope",
        }
    }
}

/// Per-turn state. Created fresh for every request and owned by one run;
/// each node takes it by value and hands back the updated record.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub session_id: Option<String>,
    pub user_input: String,
    /// Overrides the configured retrieval depth for this turn.
    pub top_k: Option<usize>,
    pub mode: AnswerMode,
    /// Rendered session memory, empty when the turn has no session.
    pub memory: String,
    pub retrieved_chunks: Vec<ChunkSearchResult>,
    pub retrieved_context: String,
    pub bot_output: String,
    pub intent: Option<Intent>,
}

impl ConversationState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>, memory: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self.memory = memory.into();
        self
    }

    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_mode(mut self, mode: AnswerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn retrieved_texts(&self) -> Vec<String> {
        self.retrieved_chunks.iter().map(|c| c.text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_normalized() {
        assert_eq!(Intent::from_label("on_topic"), Intent::OnTopic);
        assert_eq!(Intent::from_label("  ON_TOPIC.\nbecause"), Intent::OnTopic);
        assert_eq!(Intent::from_label("ask_als"), Intent::OnTopic);
        assert_eq!(Intent::from_label("\"personal\""), Intent::Personal);
        assert_eq!(Intent::from_label("Personal, the user is sad"), Intent::Personal);
        assert_eq!(Intent::from_label("out_of_scope"), Intent::OutOfScope);
    }

    #[test]
    fn unknown_labels_are_out_of_scope() {
        assert_eq!(Intent::from_label("weather"), Intent::OutOfScope);
        assert_eq!(Intent::from_label(""), Intent::OutOfScope);
        assert_eq!(Intent::from_label("   "), Intent::OutOfScope);
    }

    #[test]
    fn labels_round_trip_through_as_str() {
        for intent in [Intent::OnTopic, Intent::Personal, Intent::OutOfScope] {
            assert_eq!(Intent::from_label(intent.as_str()), intent);
        }
    }
}
