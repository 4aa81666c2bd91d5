//! Post-processing for raw model output.

use crate::core::config::defaults::ROLE_TAGS;

const ASSISTANT_TAG: &str = "<|assistant|>";

/// Phrases of the support template that small models echo back verbatim.
pub const SUPPORT_TEMPLATE_ECHOES: [&str; 4] = ["You are", "RULES:", "User question:", "Answer:"];

/// Drop chat-template leakage from model output.
///
/// When the output contains an assistant marker only the text after the last
/// one is kept; any remaining role markers are removed and the result is
/// trimmed.
pub fn strip_role_tags(output: &str) -> String {
    let tail = match output.rfind(ASSISTANT_TAG) {
        Some(position) => &output[position + ASSISTANT_TAG.len()..],
        None => output,
    };

    let mut cleaned = tail.to_string();
    for tag in ROLE_TAGS {
        if cleaned.contains(tag) {
            cleaned = cleaned.replace(tag, "");
        }
    }
    cleaned.trim().to_string()
}

pub fn strip_template_echoes(output: &str, echoes: &[&str]) -> String {
    let mut cleaned = output.to_string();
    for echo in echoes {
        cleaned = cleaned.replace(echo, "");
    }
    cleaned.trim().to_string()
}

/// Keep the first `max_lines` non-empty lines, each trimmed.
pub fn limit_lines(text: &str, max_lines: usize) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max_chars` characters, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}
