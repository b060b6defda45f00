// ABOUTME: Duplicate call filter — structural fingerprints of calls to no-repeat tools.
// ABOUTME: Rejects a call identical to the immediately preceding one instead of running it.

use tracing::{debug, info};

use super::parse::{CallExpr, Expr};
use super::validate::parse_single_call;

/// Normalized identity of a call: tool name plus sorted (key, value) pairs.
///
/// Positional arguments are keyed `arg0`, `arg1`, ... in call order; keyword
/// arguments are keyed by name. A value passed positionally therefore never
/// matches the same value passed by keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallFingerprint {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl ToolCallFingerprint {
    pub fn from_call(call: &CallExpr) -> Self {
        let mut positional = 0usize;
        let mut params: Vec<(String, String)> = call
            .args
            .iter()
            .map(|arg| {
                let key = match &arg.keyword {
                    Some(name) => name.clone(),
                    None => {
                        let key = format!("arg{}", positional);
                        positional += 1;
                        key
                    }
                };
                (key, normalize_value(&arg.value, &arg.raw))
            })
            .collect();
        params.sort();
        Self {
            name: call.name.clone(),
            params,
        }
    }

    /// Fingerprint raw call text. `None` if the text is not a single call.
    pub fn from_code(code: &str) -> Option<Self> {
        parse_single_call(code).ok().map(|call| Self::from_call(&call))
    }
}

/// String literals lose one layer of quoting so `'x'` and `"x"` compare equal.
fn normalize_value(value: &Expr, raw: &str) -> String {
    match value {
        Expr::Str(s) => s.clone(),
        _ => raw.trim().to_string(),
    }
}

/// Message returned to the model in place of a suppressed repeat call.
pub fn repeat_call_message(tool_name: &str) -> String {
    format!(
        "Error: repeat calls to `{}` with identical arguments are not allowed. \
         The previous call already returned its result; try a different approach.",
        tool_name
    )
}

/// What the filter decided about a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Reject(String),
}

/// Remembers the fingerprint of the most recent no-repeat call.
#[derive(Debug, Default, Clone)]
pub struct DuplicateFilter {
    last: Option<ToolCallFingerprint>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&ToolCallFingerprint> {
        self.last.as_ref()
    }

    /// Decide on a call given its fingerprint (if one could be extracted).
    ///
    /// Only no-repeat tools are checked. A missing fingerprint always allows
    /// the call and leaves the stored fingerprint untouched. A rejection also
    /// leaves it untouched; an allowed no-repeat call replaces it.
    pub fn check(
        &mut self,
        fingerprint: Option<ToolCallFingerprint>,
        no_repeat: bool,
    ) -> FilterDecision {
        if !no_repeat {
            return FilterDecision::Allow;
        }
        let Some(fingerprint) = fingerprint else {
            debug!("could not fingerprint call; allowing it");
            return FilterDecision::Allow;
        };
        if self.last.as_ref() == Some(&fingerprint) {
            info!(tool = %fingerprint.name, "rejecting repeated call");
            return FilterDecision::Reject(repeat_call_message(&fingerprint.name));
        }
        self.last = Some(fingerprint);
        FilterDecision::Allow
    }

    /// Convenience form of [`check`](Self::check) that fingerprints raw call text.
    pub fn check_code(&mut self, code: &str, no_repeat: bool) -> FilterDecision {
        if !no_repeat {
            return FilterDecision::Allow;
        }
        self.check(ToolCallFingerprint::from_code(code), no_repeat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_order_does_not_matter() {
        let a = ToolCallFingerprint::from_code("tool(a=1, b=2)").unwrap();
        let b = ToolCallFingerprint::from_code("tool(b=2, a=1)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quote_style_does_not_matter() {
        let a = ToolCallFingerprint::from_code("read('x')").unwrap();
        let b = ToolCallFingerprint::from_code("read(\"x\")").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.params, vec![("arg0".to_string(), "x".to_string())]);
    }

    #[test]
    fn positional_and_keyword_forms_differ() {
        let a = ToolCallFingerprint::from_code("read('x')").unwrap();
        let b = ToolCallFingerprint::from_code("read(path='x')").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn positional_order_matters() {
        let a = ToolCallFingerprint::from_code("mv('a', 'b')").unwrap();
        let b = ToolCallFingerprint::from_code("mv('b', 'a')").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_back_to_back_identical_calls() {
        let mut filter = DuplicateFilter::new();
        assert_eq!(filter.check_code("tool(a=1, b=2)", true), FilterDecision::Allow);
        match filter.check_code("tool(b=2, a=1)", true) {
            FilterDecision::Reject(msg) => {
                assert!(msg.contains("repeat calls"));
                assert!(msg.contains("not allowed"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn different_arguments_are_never_rejected() {
        let mut filter = DuplicateFilter::new();
        assert_eq!(filter.check_code("tool(a=1)", true), FilterDecision::Allow);
        assert_eq!(filter.check_code("tool(a=2)", true), FilterDecision::Allow);
        assert_eq!(filter.check_code("tool(a=1)", true), FilterDecision::Allow);
    }

    #[test]
    fn rejection_keeps_stored_fingerprint() {
        let mut filter = DuplicateFilter::new();
        filter.check_code("tool(a=1)", true);
        let stored = filter.last().cloned();
        assert!(matches!(filter.check_code("tool(a=1)", true), FilterDecision::Reject(_)));
        assert_eq!(filter.last().cloned(), stored);
        assert!(matches!(filter.check_code("tool(a=1)", true), FilterDecision::Reject(_)));
    }

    #[test]
    fn repeatable_tools_are_never_checked_or_stored() {
        let mut filter = DuplicateFilter::new();
        assert_eq!(filter.check_code("ls()", false), FilterDecision::Allow);
        assert_eq!(filter.check_code("ls()", false), FilterDecision::Allow);
        assert!(filter.last().is_none());
    }

    #[test]
    fn unparsable_calls_are_allowed() {
        let mut filter = DuplicateFilter::new();
        filter.check_code("tool(a=1)", true);
        assert_eq!(filter.check_code("tool(a=", true), FilterDecision::Allow);
        assert_eq!(filter.check_code("tool(a=", true), FilterDecision::Allow);
        assert_eq!(filter.last().unwrap().name, "tool");
    }
}
