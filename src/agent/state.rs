// ABOUTME: Per-run loop state — duplicate filter, empty-response counter, phase, and transcript.
// ABOUTME: Owned by a single Agent; the conversation knows how to bound itself for a prompt.

use tracing::debug;

use super::signal::ExitSignal;
use crate::call::DuplicateFilter;
use crate::config::WindowConfig;
use crate::error::TrimError;
use crate::message::Message;
use crate::window::{
    TrimStrategy, estimate_message_tokens, has_tool_pairs, trim_window, trim_with_pairs,
};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Where the loop is within one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    AwaitingResponse,
    RetryingEmpty,
    Validating,
    Executing,
    Recording,
    Crashed,
    Exited,
}

/// Mutable state carried across iterations of one run.
#[derive(Debug)]
pub struct AgentLoopState {
    pub filter: DuplicateFilter,
    pub empty_responses: u32,
    pub phase: LoopPhase,
    pub exit: ExitSignal,
}

impl AgentLoopState {
    pub fn new(exit: ExitSignal) -> Self {
        Self {
            filter: DuplicateFilter::new(),
            empty_responses: 0,
            phase: LoopPhase::AwaitingResponse,
            exit,
        }
    }

    pub fn transition(&mut self, to: LoopPhase) {
        if self.phase != to {
            debug!(from = ?self.phase, to = ?to, "loop phase");
            self.phase = to;
        }
    }
}

/// The transcript, split into the pinned prefix and the trimmable tail.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pinned: Vec<Message>,
    tail: Vec<Message>,
}

impl ConversationState {
    /// Pin the first `pinned_count` of `initial`; everything else is trimmable.
    pub fn new(mut initial: Vec<Message>, pinned_count: usize) -> Self {
        let tail = initial.split_off(pinned_count.min(initial.len()));
        Self {
            pinned: initial,
            tail,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.tail.push(message);
    }

    pub fn pinned(&self) -> &[Message] {
        &self.pinned
    }

    pub fn len(&self) -> usize {
        self.pinned.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full, untrimmed transcript.
    pub fn transcript(&self) -> Vec<Message> {
        let mut all = self.pinned.clone();
        all.extend_from_slice(&self.tail);
        all
    }

    /// The messages to send for the next prompt.
    ///
    /// Once the tail holds tool pairs, or the last pinned invocation is answered
    /// by the first tail message, the pairing-aware trimmer is used for the
    /// token cap and the message cap never leaves a result without its
    /// invocation. Otherwise the plain window trimmer applies both caps.
    pub fn bounded(&self, window: &WindowConfig) -> Result<Vec<Message>, TrimError> {
        let pair_across_boundary = match (self.pinned.last(), self.tail.first()) {
            (Some(last), Some(first)) => last.is_answered_by(first),
            _ => false,
        };
        if !pair_across_boundary && !has_tool_pairs(&self.tail) {
            return Ok(trim_window(
                &self.pinned,
                &self.tail,
                window.max_messages,
                window.max_tokens,
                estimate_message_tokens,
            ));
        }

        let all = self.transcript();
        let trimmed = match window.max_tokens {
            Some(cap) => trim_with_pairs(
                &all,
                self.pinned.len(),
                cap,
                TrimStrategy::KeepLast,
                false,
                estimate_message_tokens,
            )?,
            None => all,
        };
        Ok(cap_messages(trimmed, self.pinned.len(), window.max_messages))
    }
}

/// Drop the oldest unpinned messages beyond `max`, never starting on a tool result.
fn cap_messages(mut messages: Vec<Message>, pinned_count: usize, max: usize) -> Vec<Message> {
    let mut pinned = pinned_count.min(messages.len());
    if pinned > 0 && pinned < messages.len() && messages[pinned - 1].is_answered_by(&messages[pinned])
    {
        pinned += 1;
    }
    let tail_len = messages.len() - pinned;
    if tail_len <= max {
        return messages;
    }

    let mut start = pinned + (tail_len - max);
    while start < messages.len() && messages[start].is_tool_result() {
        start += 1;
    }
    debug!(dropped = start - pinned, "capped message count");
    messages.drain(pinned..start);
    messages
}

/// Remove a leading `<think>...</think>` segment and the whitespace after it.
///
/// Text without a leading segment, or with an unclosed one, is returned as is.
pub fn strip_reasoning(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(after_open) = trimmed.strip_prefix(THINK_OPEN) else {
        return text;
    };
    match after_open.find(THINK_CLOSE) {
        Some(end) => after_open[end + THINK_CLOSE.len()..].trim_start(),
        None => text,
    }
}
