pub mod api;
pub mod context;
pub mod core;
pub mod graph;
pub mod history;
pub mod llm;
pub mod rag;
pub mod state;

pub use crate::core::errors::PipelineError;
pub use api::{AskRequest, AskResponse, ChatRequest, ChatResponse};
pub use state::AppState;
