// Retrieve Node
// Fetches the top-k chunks for the user input

use async_trait::async_trait;

use crate::core::errors::PipelineError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunk texts joined with a blank line, in rank order.
pub fn join_context(texts: &[String]) -> String {
    texts.join("\n\n")
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Context Retrieval"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        let k = state.top_k.unwrap_or(ctx.settings.top_k);
        let results = ctx
            .retriever
            .query(&state.user_input, k)
            .await
            .map_err(|err| {
                let err = match err {
                    PipelineError::Retrieval(_) => err,
                    other => PipelineError::Retrieval(other.to_string()),
                };
                GraphError::from_pipeline(self.id(), err)
            })?;

        tracing::info!("Retrieve: {} chunk(s) for k={}", results.len(), k);

        state.retrieved_context = join_context(
            &results.iter().map(|r| r.text.clone()).collect::<Vec<_>>(),
        );
        state.retrieved_chunks = results;
        Ok((state, NodeOutput::Continue(None)))
    }
}
