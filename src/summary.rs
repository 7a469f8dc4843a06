// Input validation and post-processing around the summarization calls

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const MAX_INPUT_CHARS: usize = 3000;

const CONTEXT_TOKENS: i64 = 4096;
const MAX_OUTPUT_TOKENS: i64 = 200;
const MIN_OUTPUT_TOKENS: i64 = 50;

lazy_static! {
    // `.` stops at newlines, so tags only close on their own line
    static ref MARKUP: Regex = Regex::new(r"<.*?>").unwrap();
    static ref BULLET_MARKER: Regex = Regex::new(r"^[\s\-•0-9.]*").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Input text is required.")]
    Empty,

    #[error("Input text exceeds the maximum allowed length.")]
    TooLong,
}

// Trim the submitted text and check it is non-empty and not too long
pub fn validate_input(text: Option<&str>) -> Result<&str, InputError> {
    let trimmed = text.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    if trimmed.chars().count() > MAX_INPUT_CHARS {
        return Err(InputError::TooLong);
    }
    Ok(trimmed)
}

// Roughly 1.5 tokens per input word, output clamped to 50..=200
pub fn token_budget(text: &str) -> u32 {
    let words = text.split_whitespace().count().max(1) as i64;
    let input_tokens = (words * 3 + 1) / 2;
    let budget = MAX_OUTPUT_TOKENS.min(CONTEXT_TOKENS - input_tokens);
    budget.max(MIN_OUTPUT_TOKENS) as u32
}

// Strip markup, keep it no longer than the source, end it like a sentence
pub fn clean_summary(summary: &str, source: &str) -> String {
    let mut cleaned = MARKUP.replace_all(summary, "").trim().to_string();

    let limit = source.chars().count();
    if cleaned.chars().count() > limit {
        cleaned = cleaned.chars().take(limit).collect();
        cleaned.push_str("...");
    }

    if !cleaned.ends_with(['.', '!', '?']) {
        cleaned.push('.');
    }
    cleaned
}

fn is_bullet_marker(c: char) -> bool {
    c == '-' || c == '•' || c.is_ascii_digit()
}

// A new item starts at a newline followed by `-`, `•` or a digit
pub fn split_bullets(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' && chars.peek().copied().is_some_and(is_bullet_marker) {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    items.push(current);

    items
        .iter()
        .map(|item| BULLET_MARKER.replace(item, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
