// Dual Answer Node
// Factual and support branches generated concurrently, merged into one reply

use async_trait::async_trait;

use crate::context::prompt::{FACTUAL, SUPPORT};
use crate::context::sanitize::{
    limit_lines, strip_role_tags, strip_template_echoes, truncate_chars, SUPPORT_TEMPLATE_ECHOES,
};
use crate::core::config::defaults::INSUFFICIENT_INFORMATION;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;

pub struct DualAnswerNode;

impl DualAnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DualAnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the branch outputs; the support section is omitted when absent.
pub fn format_dual_response(factual: &str, support: Option<&str>) -> String {
    match support {
        Some(support) => format!(
            "Medical Summary:\n{}\n\nSupport Response:\n{}",
            factual, support
        ),
        None => format!("Medical Summary:\n{}", factual),
    }
}

#[async_trait]
impl Node for DualAnswerNode {
    fn id(&self) -> &'static str {
        "dual_answer"
    }

    fn name(&self) -> &'static str {
        "Dual Answer"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        if state.retrieved_chunks.is_empty() {
            tracing::info!("Dual answer: nothing retrieved, skipping generation");
            state.bot_output = INSUFFICIENT_INFORMATION.to_string();
            return Ok((state, NodeOutput::Final));
        }

        let context = ctx
            .processor
            .process(&state.retrieved_context, ctx.settings.token_budget)
            .await
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        let factual_prompt = ctx
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
        let support_prompt = ctx
            .prompts
            .build(SUPPORT, &[("question", state.user_input.as_str())])
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        let (factual, support) = tokio::join!(
            ctx.generator.generate(&factual_prompt, &ctx.profiles.answer),
            ctx.generator.generate(&support_prompt, &ctx.profiles.support),
        );

        let factual = factual.map_err(|err| GraphError::from_pipeline(self.id(), err))?;
        let factual = truncate_chars(&strip_role_tags(&factual), ctx.settings.factual_max_chars);

        let support = match support {
            Ok(raw) => {
                let cleaned = strip_template_echoes(&strip_role_tags(&raw), &SUPPORT_TEMPLATE_ECHOES);
                let limited = limit_lines(&cleaned, ctx.settings.support_max_lines);
                (!limited.is_empty()).then_some(limited)
            }
            Err(err) if err.is_generation_failure() => {
                tracing::warn!("Support branch failed, omitting section: {}", err);
                None
            }
            Err(err) => return Err(GraphError::from_pipeline(self.id(), err)),
        };

        state.bot_output = format_dual_response(&factual, support.as_deref());
        Ok((state, NodeOutput::Final))
    }
}
