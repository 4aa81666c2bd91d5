// Answer Node
// Grounded factual answer over the processed context

use async_trait::async_trait;

use crate::context::prompt::FACTUAL;
use crate::context::sanitize::strip_role_tags;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;

pub struct AnswerNode;

impl AnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for AnswerNode {
    fn id(&self) -> &'static str {
        "answer"
    }

    fn name(&self) -> &'static str {
        "Factual Answer"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        let context = ctx
            .processor
            .process(&state.retrieved_context, ctx.settings.token_budget)
            .await
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        let prompt = ctx
            .prompts
            .build(
                FACTUAL,
                &[
                    ("context", context.as_str()),
                    ("question", state.user_input.as_str()),
                    ("memory", state.memory.as_str()),
                ],
            )
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        let raw = ctx
            .generator
            .generate(&prompt, &ctx.profiles.answer)
            .await
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        state.bot_output = strip_role_tags(&raw);
        Ok((state, NodeOutput::Continue(None)))
    }
}
