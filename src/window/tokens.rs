// ABOUTME: Token estimation heuristic used by both window trimmers.
// ABOUTME: Bytes / 2 per message with a floor of one token; empty messages count zero.

use crate::message::Message;

/// Heuristic token count for one message: `max(1, bytes / 2)`, or 0 if empty.
///
/// Block content is measured on its string form.
pub fn estimate_message_tokens(message: &Message) -> usize {
    if message.content.is_empty() {
        return 0;
    }
    let bytes = message.text().len();
    if bytes == 0 {
        return 0;
    }
    (bytes / 2).max(1)
}

/// Sum of [`estimate_message_tokens`] across messages.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Sum of a caller-supplied per-message estimator across messages.
pub fn estimate_with<F>(messages: &[Message], estimate: &F) -> usize
where
    F: Fn(&Message) -> usize,
{
    messages.iter().map(estimate).sum()
}
