//! crates/line_by_line_core/src/masking.rs
//!
//! Renders a line with its trailing words hidden according to its mask level.

use crate::domain::Line;

const MASK_CHAR: char = '_';

/// The line's words, with the last `mask_level` replaced by underscores of
/// equal length. Words are re-joined with single spaces.
pub fn masked_text(line: &Line) -> String {
    mask_words(&line.original_line_text, line.mask_level)
}

pub fn mask_words(text: &str, mask_level: u32) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    // Never hide every word, whatever the stored level says.
    let hidden = (mask_level as usize).min(words.len().saturating_sub(1));
    let visible = words.len() - hidden;

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i < visible {
                (*word).to_string()
            } else {
                MASK_CHAR.to_string().repeat(word.chars().count())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
