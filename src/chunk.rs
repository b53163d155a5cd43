//! Token-window text chunker.
//!
//! Splits text on runs of whitespace and groups the resulting tokens into
//! ordered chunks of at most `max_tokens` tokens, the unit of input the
//! embedding model accepts. The final chunk may be shorter; empty text
//! yields zero chunks.

/// Split text into whitespace-token chunks of at most `max_tokens` tokens.
/// A zero `max_tokens` is treated as 1 rather than panicking.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .chunks(max_tokens.max(1))
        .map(|window| window.join(" "))
        .collect()
}
