// ABOUTME: Call grammar validator — decides whether text is exactly one call expression.
// ABOUTME: Strips an optional fenced-code wrapper before parsing; never errors, only answers.

use super::parse::{CallExpr, Expr, parse_program};
use crate::error::CallParseError;

const FENCE: &str = "```";

/// Strip a single fenced-code wrapper (```` ```lang ```` ... ```` ``` ````) if present.
///
/// Only the leading and trailing delimiter lines are removed; the body is returned
/// trimmed. Text without a leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        // Single-line form: ```call()```
        None => after_open,
    };
    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// True iff `text` is exactly one top-level call expression.
pub fn validate_call(text: &str) -> bool {
    parse_single_call(text).is_ok()
}

/// Parse `text` as exactly one call expression, reporting why it is not one.
pub fn parse_single_call(text: &str) -> Result<CallExpr, CallParseError> {
    let body = strip_code_fence(text);
    let mut statements = parse_program(body)?;
    match statements.len() {
        0 => Err(CallParseError::new("no call expression found", 0)),
        1 => match statements.remove(0).expr {
            Expr::Call(call) => Ok(call),
            _ => Err(CallParseError::new("top-level expression is not a call", 0)),
        },
        n => Err(CallParseError::new(
            format!("expected exactly one call, found {} statements", n),
            statements[1].span.start,
        )),
    }
}
