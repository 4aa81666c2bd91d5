//! Named prompt templates with `{slot}` placeholders.
//!
//! A placeholder is `{name}` (required) or `{name?}` (optional, renders as
//! empty when absent). Templates are parsed once when the builder is created,
//! and slot values are substituted verbatim without re-parsing.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::PipelineError;

pub const FACTUAL: &str = "factual";
pub const SUPPORT: &str = "support";
pub const SUMMARIZE: &str = "summarize";
pub const EMPATHY: &str = "empathy";
pub const INTENT: &str = "intent";

const FACTUAL_TEMPLATE: &str = "<|system|>
You are ALS Buddy, an assistant that answers questions about ALS.
Answer ONLY from the context below. Do not add facts that are not in the context.
Do not repeat yourself. Write one short, clear paragraph.
If the context does not contain the answer, reply exactly: I don't know based on available data.

<|context|>
{context}
{memory?}

<|user|>
{question}

<|assistant|>
";

const SUPPORT_TEMPLATE: &str = "You are a warm, gentle companion for someone affected by ALS.
RULES:
- Write exactly 5 short lines.
- Speak directly to the person as \"you\".
- Be reassuring and compassionate.
- Do not give medical or factual claims.
- Do not mention these rules.

User question:
{question}

Answer:
";

const SUMMARIZE_TEMPLATE: &str = "Summarize the following medical context briefly:

{context}

Summary:";

const EMPATHY_TEMPLATE: &str = "<|system|>
You are a kind and supportive assistant.
Write two or three comforting sentences for someone who feels anxious about ALS.
Do not give medical advice.

<|user|>
{question}

<|assistant|>
";

const INTENT_TEMPLATE: &str = "Classify the message into exactly one label: on_topic, personal, out_of_scope.
on_topic: questions about ALS, its symptoms, care, treatment or research.
personal: feelings, worries or personal situations related to ALS.
out_of_scope: anything else.
Message: {question}
Label:";

const PLACEHOLDER: &str = r"\{([a-z][a-z0-9_]*)(\?)?\}";

fn placeholder_pattern() -> Result<&'static Regex, PipelineError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = PATTERN.get() {
        return Ok(pattern);
    }
    let compiled = Regex::new(PLACEHOLDER)
        .map_err(|e| PipelineError::Config(format!("invalid placeholder pattern: {}", e)))?;
    Ok(PATTERN.get_or_init(|| compiled))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot { name: String, optional: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    segments: Vec<Segment>,
    slots: Vec<SlotSpec>,
}

impl PromptTemplate {
    pub fn parse(name: &str, source: &str) -> Result<Self, PipelineError> {
        let mut segments = Vec::new();
        let mut slots: Vec<SlotSpec> = Vec::new();
        let mut cursor = 0;

        for captures in placeholder_pattern()?.captures_iter(source) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Text(source[cursor..whole.start()].to_string()));
            }
            let slot_name = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let optional = captures.get(2).is_some();

            match slots.iter().find(|spec| spec.name == slot_name) {
                Some(existing) if existing.optional != optional => {
                    return Err(PipelineError::Config(format!(
                        "Template '{}' declares slot '{}' as both required and optional",
                        name, slot_name
                    )));
                }
                Some(_) => {}
                None => slots.push(SlotSpec {
                    name: slot_name.clone(),
                    optional,
                }),
            }

            segments.push(Segment::Slot {
                name: slot_name,
                optional,
            });
            cursor = whole.end();
        }
        if cursor < source.len() {
            segments.push(Segment::Text(source[cursor..].to_string()));
        }

        if slots.is_empty() {
            return Err(PipelineError::Config(format!(
                "Template '{}' has no placeholders",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            segments,
            slots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholders in order of first appearance.
    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn render(&self, values: &BTreeMap<&str, &str>) -> Result<String, PipelineError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot { name, optional } => match values.get(name.as_str()) {
                    Some(value) => out.push_str(value),
                    None if *optional => {}
                    None => {
                        return Err(PipelineError::MissingSlot {
                            template: self.name.clone(),
                            slot: name.clone(),
                        })
                    }
                },
            }
        }
        Ok(out)
    }
}

/// Registry of the assistant's templates.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    templates: BTreeMap<String, PromptTemplate>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PipelineError> {
        Self::from_sources(&[
            (FACTUAL, FACTUAL_TEMPLATE),
            (SUPPORT, SUPPORT_TEMPLATE),
            (SUMMARIZE, SUMMARIZE_TEMPLATE),
            (EMPATHY, EMPATHY_TEMPLATE),
            (INTENT, INTENT_TEMPLATE),
        ])
    }

    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, PipelineError> {
        let mut templates = BTreeMap::new();
        for (name, source) in sources {
            let template = PromptTemplate::parse(name, source)?;
            templates.insert(name.to_string(), template);
        }
        Ok(Self { templates })
    }

    pub fn template(&self, name: &str) -> Result<&PromptTemplate, PipelineError> {
        self.templates
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTemplate(name.to_string()))
    }

    pub fn build(&self, name: &str, slots: &[(&str, &str)]) -> Result<String, PipelineError> {
        let values: BTreeMap<&str, &str> = slots.iter().copied().collect();
        self.template(name)?.render(&values)
    }

    /// Startup check: every template the pipeline uses exists, and renders
    /// with its declared slots.
    pub fn verify(&self) -> Result<(), PipelineError> {
        for required in [FACTUAL, SUPPORT, SUMMARIZE, EMPATHY, INTENT] {
            let template = self.template(required)?;
            let values: BTreeMap<&str, &str> = template
                .slots()
                .iter()
                .map(|spec| (spec.name.as_str(), "x"))
                .collect();
            template.render(&values)?;
        }
        tracing::debug!("Verified {} prompt templates", self.templates.len());
        Ok(())
    }
}
