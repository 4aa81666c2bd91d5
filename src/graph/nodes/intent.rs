// Intent Node
// Classifies the message and branches on the label

use async_trait::async_trait;

use crate::context::prompt::INTENT;
use crate::context::sanitize::strip_role_tags;
use crate::core::config::ClassifierKind;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{ConversationState, Intent};

use super::empathy::needs_empathy;

const TOPIC_TERMS: [&str; 24] = [
    "als",
    "amyotrophic",
    "sclerosis",
    "gehrig",
    "motor",
    "neuron",
    "neurons",
    "symptom",
    "symptoms",
    "diagnosis",
    "diagnosed",
    "treatment",
    "treatments",
    "riluzole",
    "edaravone",
    "muscle",
    "weakness",
    "breathing",
    "swallowing",
    "speech",
    "therapy",
    "caregiver",
    "progression",
    "cure",
];

const PERSONAL_PHRASES: [&str; 6] = [
    "i feel",
    "i am feeling",
    "i'm feeling",
    "my family",
    "my husband",
    "my wife",
];

pub struct IntentNode;

impl IntentNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntentNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyword classifier used directly or as the fallback when the model
/// cannot be reached.
pub fn classify_by_rules(input: &str, empathy_keywords: &[String]) -> Intent {
    let lowered = input.to_lowercase();
    if needs_empathy(input, empathy_keywords)
        || PERSONAL_PHRASES.iter().any(|p| lowered.contains(p))
    {
        return Intent::Personal;
    }

    let on_topic = lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| TOPIC_TERMS.contains(&word));
    if on_topic {
        Intent::OnTopic
    } else {
        Intent::OutOfScope
    }
}

#[async_trait]
impl Node for IntentNode {
    fn id(&self) -> &'static str {
        "intent"
    }

    fn name(&self) -> &'static str {
        "Intent Router"
    }

    async fn execute(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<(ConversationState, NodeOutput), GraphError> {
        let rules = || classify_by_rules(&state.user_input, &ctx.settings.empathy_keywords);

        let intent = match ctx.settings.classifier {
            ClassifierKind::Rules => rules(),
            ClassifierKind::Llm => {
                let prompt = ctx
                    .prompts
                    .build(INTENT, &[("question", state.user_input.as_str())])
                    .map_err(|err| GraphError::from_pipeline(self.id(), err))?;
                match ctx.generator.generate(&prompt, &ctx.profiles.intent).await {
                    Ok(raw) => Intent::from_label(&strip_role_tags(&raw)),
                    Err(err) if err.is_generation_failure() => {
                        tracing::warn!("Intent model unavailable, using rules: {}", err);
                        rules()
                    }
                    Err(err) => return Err(GraphError::from_pipeline(self.id(), err)),
                }
            }
        };

        tracing::info!("Intent: classified as {}", intent.as_str());
        state.intent = Some(intent);
        Ok((state, NodeOutput::Branch(intent.as_str().to_string())))
    }
}
