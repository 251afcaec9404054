//! Token estimation utilities.
//!
//! Uses a character-based heuristic: one token per four Unicode scalar
//! values, rounded up. This is an approximation, not a tokenizer; callers
//! must not rely on it matching the model's count.

use learnloop_core::message::Message;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a single message (content only).
pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content)
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
