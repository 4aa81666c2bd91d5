//! Prompt-side text handling: context cleanup, templates and output
//! sanitizing.

pub mod processor;
pub mod prompt;
pub mod sanitize;

pub use processor::{clean, dedupe_lines, ContextProcessor};
pub use prompt::{PromptBuilder, PromptTemplate};
