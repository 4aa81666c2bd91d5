//! Sliding-window text chunker.
//!
//! Windows are measured in characters. Each window end is pulled back to the
//! latest natural breakpoint in the back half of the window: paragraph
//! break first, then sentence end, then whitespace. Only when none exists is
//! the text cut mid-word. The next window starts `overlap` characters before
//! the previous end, nudged forward to a word start when one exists before
//! that end.

use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// A bounded segment of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Ordinal within the source document.
    pub index: usize,
    /// Character offset of the window start in the source text.
    pub start_offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, PipelineError> {
    if chunk_size == 0 {
        return Err(PipelineError::Config("chunk_size must be positive".into()));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let hard_end = (start + chunk_size).min(total);
        let end = if hard_end < total {
            find_breakpoint(&chars, start, hard_end, chunk_size)
        } else {
            hard_end
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                text: trimmed.to_string(),
                index: chunks.len(),
                start_offset: start,
                embedding: None,
            });
        }

        if end >= total {
            break;
        }

        let mut next = end.saturating_sub(overlap).max(start + 1);
        let mut word_start = next;
        while word_start < end && is_mid_word(&chars, word_start) {
            word_start += 1;
        }
        if !is_mid_word(&chars, word_start) {
            next = word_start;
        }
        start = next;
    }

    Ok(chunks)
}

/// Latest natural cut position in `(start + chunk_size / 2, hard_end]`.
fn find_breakpoint(chars: &[char], start: usize, hard_end: usize, chunk_size: usize) -> usize {
    let lo = start + (chunk_size / 2).max(1);
    if lo >= hard_end {
        return hard_end;
    }

    // Paragraph break: cut after the blank line.
    for i in (lo..hard_end.saturating_sub(1)).rev() {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            return i + 2;
        }
    }

    // Sentence end followed by whitespace.
    for i in (lo..hard_end).rev() {
        if matches!(chars[i], '.' | '!' | '?')
            && chars.get(i + 1).is_some_and(|c| c.is_whitespace())
        {
            return i + 1;
        }
    }

    // Word boundary; `hard_end` itself is a valid index because the window
    // stops short of the end of the text.
    for i in (lo..=hard_end).rev() {
        if chars[i].is_whitespace() {
            return i;
        }
    }

    hard_end
}

fn is_mid_word(chars: &[char], position: usize) -> bool {
    position > 0
        && position < chars.len()
        && !chars[position - 1].is_whitespace()
        && !chars[position].is_whitespace()
}
