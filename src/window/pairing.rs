// ABOUTME: Pairing-aware trimmer — keeps tool invocations and their results together.
// ABOUTME: Walks newest-first over atomic units and never emits half of a pair.

use tracing::debug;

use super::tokens::estimate_with;
use crate::error::TrimError;
use crate::message::Message;

/// Which end of the transcript survives trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimStrategy {
    #[default]
    KeepLast,
    KeepFirst,
}

impl TrimStrategy {
    fn as_str(self) -> &'static str {
        match self {
            TrimStrategy::KeepLast => "keep_last",
            TrimStrategy::KeepFirst => "keep_first",
        }
    }
}

/// True if any tool invocation in `messages` is immediately followed by its result.
pub fn has_tool_pairs(messages: &[Message]) -> bool {
    messages.windows(2).any(|w| w[0].is_answered_by(&w[1]))
}

/// A contiguous run of messages that is kept or dropped as a whole.
struct Unit {
    start: usize,
    len: usize,
    tokens: usize,
}

/// Trim `messages` to `max_tokens` without splitting any invocation/result pair.
///
/// The first `pinned_count` messages are always kept. When the last pinned
/// message is an invocation whose result comes next, that result is kept too.
/// Remaining units are accepted newest-first until the next one would overflow
/// the budget, then restored to their original order. Any invocation left
/// without its result directly after it is dropped.
pub fn trim_with_pairs<F>(
    messages: &[Message],
    pinned_count: usize,
    max_tokens: usize,
    strategy: TrimStrategy,
    allow_partial: bool,
    estimate: F,
) -> Result<Vec<Message>, TrimError>
where
    F: Fn(&Message) -> usize,
{
    if strategy != TrimStrategy::KeepLast {
        return Err(TrimError::UnsupportedStrategy(strategy.as_str()));
    }
    if allow_partial {
        return Err(TrimError::PartialTrimUnsupported);
    }

    if estimate_with(messages, &estimate) <= max_tokens {
        return Ok(messages.to_vec());
    }

    let mut pinned = pinned_count.min(messages.len());
    if pinned > 0 && pinned < messages.len() && messages[pinned - 1].is_answered_by(&messages[pinned])
    {
        pinned += 1;
    }
    let prefix = &messages[..pinned];

    let mut units = Vec::new();
    let mut i = pinned;
    while i < messages.len() {
        let len = if i + 1 < messages.len() && messages[i].is_answered_by(&messages[i + 1]) {
            2
        } else {
            1
        };
        units.push(Unit {
            start: i,
            len,
            tokens: estimate_with(&messages[i..i + len], &estimate),
        });
        i += len;
    }

    let budget = max_tokens.saturating_sub(estimate_with(prefix, &estimate));
    let mut used = 0;
    let mut accepted = 0;
    for unit in units.iter().rev() {
        if used + unit.tokens > budget {
            break;
        }
        used += unit.tokens;
        accepted += 1;
    }

    let kept_units = &units[units.len() - accepted..];
    let mut tail = Vec::new();
    for unit in kept_units {
        tail.extend_from_slice(&messages[unit.start..unit.start + unit.len]);
    }
    let tail = drop_unanswered_invocations(tail);

    debug!(
        pinned,
        kept = tail.len(),
        dropped = messages.len() - pinned - tail.len(),
        tokens = used,
        "pairing-aware trim"
    );

    let mut out = prefix.to_vec();
    out.extend(tail);
    Ok(out)
}

fn drop_unanswered_invocations(messages: Vec<Message>) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        if message.is_tool_invocation() {
            let answered = messages
                .get(i + 1)
                .is_some_and(|next| message.is_answered_by(next));
            if !answered {
                debug!(link = ?message.tool_link_id, "dropping unanswered tool invocation");
                continue;
            }
        }
        out.push(message.clone());
    }
    out
}
