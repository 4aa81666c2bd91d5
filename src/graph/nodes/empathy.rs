// Empathy Node
// Appends a short comforting addendum when the user sounds distressed

use async_trait::async_trait;

use crate::context::prompt::EMPATHY;
use crate::context::sanitize::strip_role_tags;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;

pub struct EmpathyNode;

impl EmpathyNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmpathyNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive whole-word match of any keyword in `input`.
pub fn needs_empathy(input: &str, keywords: &[String]) -> bool {
    let words: Vec<String> = input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| words.iter().any(|w| *w == k))
}

#[async_trait]
impl Node for EmpathyNode {
    fn id(&self) -> &'static str {
        "empathy"
    }

    fn name(&self) -> &'static str {
        "Empathy Check"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        if !needs_empathy(&state.user_input, &ctx.settings.empathy_keywords) {
            return Ok((state, NodeOutput::Final));
        }

        let prompt = ctx
            .prompts
            .build(EMPATHY, &[("question", state.user_input.as_str())])
            .map_err(|err| GraphError::from_pipeline(self.id(), err))?;

        match ctx.generator.generate(&prompt, &ctx.profiles.support).await {
            Ok(raw) => {
                let addendum = strip_role_tags(&raw);
                if !addendum.is_empty() {
                    if state.bot_output.is_empty() {
                        state.bot_output = addendum;
                    } else {
                        state.bot_output = format!("{}\n\n{}", state.bot_output, addendum);
                    }
                }
            }
            Err(err) if err.is_generation_failure() => {
                tracing::warn!("Empathy addendum skipped: {}", err);
            }
            Err(err) => return Err(GraphError::from_pipeline(self.id(), err)),
        }
        Ok((state, NodeOutput::Final))
    }
}
