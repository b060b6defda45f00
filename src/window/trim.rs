// ABOUTME: Conversation window trimmer — message-count cap then optional token cap.
// ABOUTME: Drops from the front of the mutable tail only; the pinned prefix always survives.

use tracing::debug;

use super::tokens::estimate_with;
use crate::message::Message;

/// Trim `tail` so that `prefix ++ tail` fits the caps, returning the result.
///
/// First the tail is cut from the front to at most `max_messages`. Then, if
/// `max_tokens` is set, front-most tail messages are dropped while the combined
/// estimate exceeds it, stopping once the tail is empty. This trimmer knows
/// nothing about tool pairs and may separate an invocation from its result.
pub fn trim_window<F>(
    prefix: &[Message],
    tail: &[Message],
    max_messages: usize,
    max_tokens: Option<usize>,
    estimate: F,
) -> Vec<Message>
where
    F: Fn(&Message) -> usize,
{
    let mut start = tail.len().saturating_sub(max_messages);

    if let Some(cap) = max_tokens {
        let prefix_tokens = estimate_with(prefix, &estimate);
        let mut tail_tokens = estimate_with(&tail[start..], &estimate);
        while start < tail.len() && prefix_tokens + tail_tokens > cap {
            tail_tokens -= estimate(&tail[start]);
            start += 1;
        }
    }

    if start > 0 {
        debug!(dropped = start, kept = tail.len() - start, "trimmed conversation window");
    }

    let mut out = Vec::with_capacity(prefix.len() + tail.len() - start);
    out.extend_from_slice(prefix);
    out.extend_from_slice(&tail[start..]);
    out
}
