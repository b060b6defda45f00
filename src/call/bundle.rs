// ABOUTME: Call bundler — splits adjacent top-level calls into an ordered sequence.
// ABOUTME: Splits only when every statement is a call to a bundleable tool; otherwise one unit.

use tracing::debug;

use super::parse::parse_program;
use super::validate::strip_code_fence;

/// Split `text` into its individual calls when it is a bundle.
///
/// Returns the exact source substring of each call, in source order, when there
/// are two or more top-level statements and all of them are calls whose name
/// satisfies `is_bundleable`. In every other case, including parse failures,
/// returns the original text as the only element.
pub fn split_bundle(text: &str, is_bundleable: impl Fn(&str) -> bool) -> Vec<String> {
    let body = strip_code_fence(text);
    let Ok(statements) = parse_program(body) else {
        return vec![text.to_string()];
    };
    if statements.len() < 2 {
        return vec![text.to_string()];
    }

    let all_bundleable = statements
        .iter()
        .all(|stmt| stmt.as_call().is_some_and(|call| is_bundleable(&call.name)));
    if !all_bundleable {
        debug!(
            statements = statements.len(),
            "multiple statements but not all bundleable; keeping as one unit"
        );
        return vec![text.to_string()];
    }

    statements
        .iter()
        .map(|stmt| stmt.span.slice(body).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundleable(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |name: &str| names.iter().any(|n| *n == name)
    }

    #[test]
    fn splits_two_bundleable_calls() {
        let calls = split_bundle("f(1)\ng(2)", bundleable(&["f", "g"]));
        assert_eq!(calls, vec!["f(1)", "g(2)"]);
    }

    #[test]
    fn keeps_text_when_one_call_is_not_bundleable() {
        let text = "f(1)\ng(2)";
        assert_eq!(split_bundle(text, bundleable(&["f"])), vec![text]);
    }

    #[test]
    fn single_call_is_returned_unchanged() {
        let text = "```python\nf(1)\n```";
        assert_eq!(split_bundle(text, bundleable(&["f"])), vec![text]);
    }

    #[test]
    fn preserves_argument_text_exactly() {
        let text = "```\nread(path=\"a.txt\",  lines=[1,2])\nread('b.txt')\n```";
        let calls = split_bundle(text, bundleable(&["read"]));
        assert_eq!(calls, vec!["read(path=\"a.txt\",  lines=[1,2])", "read('b.txt')"]);
    }

    #[test]
    fn multiline_calls_keep_their_internal_newlines() {
        let text = "write('a',\n  'x')\nwrite('b', 'y')";
        let calls = split_bundle(text, bundleable(&["write"]));
        assert_eq!(calls, vec!["write('a',\n  'x')", "write('b', 'y')"]);
    }

    #[test]
    fn non_call_statement_prevents_split() {
        let text = "f(1)\n42";
        assert_eq!(split_bundle(text, bundleable(&["f"])), vec![text]);
    }

    #[test]
    fn parse_failure_returns_original() {
        let text = "f(1)\ng(2";
        assert_eq!(split_bundle(text, bundleable(&["f", "g"])), vec![text]);
    }
}
