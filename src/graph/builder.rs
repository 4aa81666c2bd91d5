// Graph Builder
// Constructs the answer graphs using petgraph

use super::node::GraphError;
use super::nodes::{AnswerNode, DualAnswerNode, EmpathyNode, IntentNode, RefusalNode, RetrieveNode};
use super::runtime::{GraphBuilder, GraphRuntime};
use super::state::{AnswerMode, Intent};

/// Build the graph for one answer mode, optionally behind the intent router.
///
/// Linear:  retrieve -> answer -> empathy
/// Dual:    retrieve -> dual_answer
/// Routed:  intent -(on_topic|personal)-> retrieve ..., intent -(out_of_scope)-> refusal
pub fn build_answer_graph(mode: AnswerMode, with_intent: bool) -> Result<GraphRuntime, GraphError> {
    let mut builder = GraphBuilder::new()
        .max_steps(8)
        .entry(if with_intent { "intent" } else { "retrieve" })
        .node(Box::new(RetrieveNode::new()));

    builder = match mode {
        AnswerMode::Linear => builder
            .node(Box::new(AnswerNode::new()))
            .node(Box::new(EmpathyNode::new()))
            .edge("retrieve", "answer")
            .edge("answer", "empathy"),
        AnswerMode::Dual => builder
            .node(Box::new(DualAnswerNode::new()))
            .edge("retrieve", "dual_answer"),
    };

    if with_intent {
        builder = builder
            .node(Box::new(IntentNode::new()))
            .node(Box::new(RefusalNode::new()))
            .conditional_edge("intent", "retrieve", Intent::OnTopic.as_str())
            .conditional_edge("intent", "retrieve", Intent::Personal.as_str())
            .conditional_edge("intent", "refusal", Intent::OutOfScope.as_str());
    }

    builder.build()
}

pub fn build_linear_graph() -> Result<GraphRuntime, GraphError> {
    build_answer_graph(AnswerMode::Linear, false)
}

pub fn build_dual_graph() -> Result<GraphRuntime, GraphError> {
    build_answer_graph(AnswerMode::Dual, false)
}
