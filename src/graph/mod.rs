// ALS Buddy Graph Module
// StateGraph orchestration of a conversation turn

pub mod builder;
pub mod node;
pub mod nodes;
pub mod orchestrator;
pub mod runtime;
pub mod state;

#[cfg(test)]
mod tests;

pub use builder::{build_answer_graph, build_dual_graph, build_linear_graph};
pub use node::{GraphError, Node, NodeContext, NodeOutput, PipelineSettings};
pub use orchestrator::Orchestrator;
pub use runtime::{GraphBuilder, GraphRuntime};
pub use state::{AnswerMode, ConversationState, Intent};
