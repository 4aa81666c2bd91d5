// Refusal Node
// Fixed reply for out-of-scope messages

use async_trait::async_trait;

use crate::core::config::defaults::OUT_OF_SCOPE_REFUSAL;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;

pub struct RefusalNode;

impl RefusalNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RefusalNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RefusalNode {
    fn id(&self) -> &'static str {
        "refusal"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        _ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        tracing::info!("Refusal: message classified out of scope");
        state.bot_output = OUT_OF_SCOPE_REFUSAL.to_string();
        Ok((state, NodeOutput::Final))
    }
}
