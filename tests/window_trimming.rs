// ABOUTME: Integration tests for the conversation window trimmers.
// ABOUTME: Checks the pinned prefix, the caps, and the tool-pairing invariant on realistic transcripts.

use calloop::error::TrimError;
use calloop::message::Message;
use calloop::window::{
    TrimStrategy, estimate_message_tokens, estimate_tokens, trim_window, trim_with_pairs,
};

/// A system prompt, a task, and `turns` tool round trips with verbose results.
fn session(turns: usize) -> Vec<Message> {
    let mut messages = vec![
        Message::system("You are a careful coding agent."),
        Message::human("Find where the config is loaded and summarize it."),
    ];
    for i in 0..turns {
        let id = format!("call-{}", i);
        messages.push(Message::tool_invocation(
            format!("read_file('src/module_{}.rs')", i),
            id.clone(),
        ));
        messages.push(Message::tool_result(
            format!("// module {}\n{}", i, "fn body() {}\n".repeat(20)),
            id,
        ));
    }
    messages
}

fn pairing_holds(messages: &[Message]) -> bool {
    messages.iter().enumerate().all(|(i, m)| {
        let invocation_ok =
            !m.is_tool_invocation() || messages.get(i + 1).is_some_and(|n| m.is_answered_by(n));
        let result_ok = !m.is_tool_result() || (i > 0 && messages[i - 1].is_answered_by(m));
        invocation_ok && result_ok
    })
}

#[test]
fn in_budget_transcript_is_unchanged_by_both_trimmers() {
    let messages = session(3);
    let total = estimate_tokens(&messages);

    let (prefix, tail) = messages.split_at(1);
    let windowed = trim_window(prefix, tail, messages.len(), Some(total), estimate_message_tokens);
    assert_eq!(windowed, messages);

    let paired = trim_with_pairs(
        &messages,
        1,
        total,
        TrimStrategy::KeepLast,
        false,
        estimate_message_tokens,
    )
    .unwrap();
    assert_eq!(paired, messages);
}

#[test]
fn pairing_invariant_holds_across_budgets() {
    let messages = session(6);
    let total = estimate_tokens(&messages);
    for budget in (0..=total).step_by(7) {
        let out = trim_with_pairs(
            &messages,
            2,
            budget,
            TrimStrategy::KeepLast,
            false,
            estimate_message_tokens,
        )
        .unwrap();
        assert!(pairing_holds(&out), "pair split at budget {}", budget);
        assert_eq!(out[..2], messages[..2]);
        if budget < total {
            assert!(out.len() < messages.len());
        }
    }
}

#[test]
fn pairing_trimmer_keeps_the_newest_rounds() {
    let messages = session(5);
    let pinned_tokens = estimate_tokens(&messages[..2]);
    let pair_tokens = estimate_tokens(&messages[2..4]);
    let budget = pinned_tokens + pair_tokens * 2;

    let out = trim_with_pairs(
        &messages,
        2,
        budget,
        TrimStrategy::KeepLast,
        false,
        estimate_message_tokens,
    )
    .unwrap();
    let kept_ids: Vec<_> = out[2..]
        .iter()
        .filter_map(|m| m.tool_link_id.as_deref())
        .collect();
    assert_eq!(kept_ids, vec!["call-3", "call-3", "call-4", "call-4"]);
}

#[test]
fn plain_trimmer_may_split_pairs_but_keeps_prefix() {
    let messages = session(4);
    let (prefix, tail) = messages.split_at(2);
    let out = trim_window(prefix, tail, 3, None, estimate_message_tokens);
    assert_eq!(out.len(), 5);
    assert_eq!(out[..2], messages[..2]);
    // Three newest tail messages start on a result whose invocation was dropped.
    assert!(out[2].is_tool_result());
}

#[test]
fn unsupported_options_are_errors() {
    let messages = session(1);
    assert_eq!(
        trim_with_pairs(&messages, 1, 10, TrimStrategy::KeepFirst, false, estimate_message_tokens),
        Err(TrimError::UnsupportedStrategy("keep_first"))
    );
    assert_eq!(
        trim_with_pairs(&messages, 1, 10, TrimStrategy::KeepLast, true, estimate_message_tokens),
        Err(TrimError::PartialTrimUnsupported)
    );
}

#[test]
fn messages_roundtrip_through_json() {
    let messages = session(1);
    let json = serde_json::to_string(&messages).unwrap();
    let parsed: Vec<Message> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, messages);
}
