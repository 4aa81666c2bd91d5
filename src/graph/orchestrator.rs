// Orchestrator
// Owns the compiled graphs and the services they run against

use super::builder::build_answer_graph;
use super::node::{GraphError, NodeContext};
use super::runtime::GraphRuntime;
use super::state::{AnswerMode, ConversationState};
use crate::core::errors::PipelineError;

pub struct Orchestrator {
    ctx: NodeContext,
    linear: GraphRuntime,
    dual: GraphRuntime,
    routed_linear: GraphRuntime,
    routed_dual: GraphRuntime,
}

impl Orchestrator {
    pub fn new(ctx: NodeContext) -> Result<Self, GraphError> {
        Ok(Self {
            ctx,
            linear: build_answer_graph(AnswerMode::Linear, false)?,
            dual: build_answer_graph(AnswerMode::Dual, false)?,
            routed_linear: build_answer_graph(AnswerMode::Linear, true)?,
            routed_dual: build_answer_graph(AnswerMode::Dual, true)?,
        })
    }

    /// Run one turn in the state's answer mode, behind the intent router when
    /// `routed` is set.
    pub async fn run(
        &self,
        state: ConversationState,
        routed: bool,
    ) -> Result<ConversationState, PipelineError> {
        let graph = match (state.mode, routed) {
            (AnswerMode::Linear, false) => &self.linear,
            (AnswerMode::Dual, false) => &self.dual,
            (AnswerMode::Linear, true) => &self.routed_linear,
            (AnswerMode::Dual, true) => &self.routed_dual,
        };

        graph.run(state, &self.ctx).await.map_err(|err| {
            tracing::error!("Turn failed: {}", err);
            err.into_pipeline_error()
        })
    }
}
