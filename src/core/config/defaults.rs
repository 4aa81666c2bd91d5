/// Literal fragments of retrieval-chain prompts that leak into stored chunks
/// and confuse the model when echoed back as context.
pub const DEFAULT_BOILERPLATE: [&str; 4] = [
    "Use the following pieces of context to answer the question at the end.",
    "If you don't know the answer, just say that you don't know, don't try to make up an answer.",
    "Helpful Answer:",
    "Skip to main content",
];

pub const DEFAULT_EMPATHY_KEYWORDS: [&str; 10] = [
    "sad",
    "worried",
    "scared",
    "afraid",
    "anxious",
    "depressed",
    "lonely",
    "hopeless",
    "frightened",
    "overwhelmed",
];

/// Chat-template role markers that small chat models echo back.
pub const ROLE_TAGS: [&str; 6] = [
    "<|system|>",
    "<|user|>",
    "<|assistant|>",
    "<|context|>",
    "</s>",
    "<s>",
];

pub const INSUFFICIENT_INFORMATION: &str = "I don't know based on available data.";

pub const OUT_OF_SCOPE_REFUSAL: &str = "I'm sorry, I don't have the information to help with that topic. For medical or legal advice, please consult a licensed professional.";

pub const GENERIC_APOLOGY: &str =
    "I'm sorry, something went wrong while answering your question. Please try again in a moment.";

/// Content placeholders written by the scraper for pages it could not read.
pub const NO_CONTENT_PLACEHOLDER: &str = "No content extracted";
pub const FETCH_ERROR_PREFIX: &str = "Error fetching URL:";

pub fn default_stop_sequences() -> Vec<String> {
    ["<|system|>", "<|user|>", "<|context|>"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_boilerplate() -> Vec<String> {
    DEFAULT_BOILERPLATE.iter().map(|s| s.to_string()).collect()
}

pub fn default_empathy_keywords() -> Vec<String> {
    DEFAULT_EMPATHY_KEYWORDS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
