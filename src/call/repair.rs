// ABOUTME: Malformed call repair — asks a secondary model invocation to reformat bad call text.
// ABOUTME: Extracts the first name(args) span from the reply; no span is fatal for the iteration.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::agent::ModelClient;
use crate::error::ToolExecutionError;
use crate::message::Message;
use crate::prompt::{REPAIR_INSTRUCTION, repair_prompt};

static CALL_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*\(").expect("call start pattern is valid")
});

static NEWLINE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\r?\n\s*").expect("newline pattern is valid"));

/// Pull the first `name(args)` span out of free text, collapsing newlines in
/// the argument span to single spaces.
///
/// The span ends at the parenthesis that balances the opening one, so prose
/// after the call is left out even when it has parentheses of its own. When
/// nothing balances, the span runs to the last `)` in the text.
pub fn extract_call_span(reply: &str) -> Option<String> {
    let start = CALL_START_RE.find(reply)?;
    let open = start.end() - 1;
    let close =
        matching_close(reply, open).or_else(|| reply.rfind(')').filter(|&idx| idx > open))?;
    let name = &reply[start.start()..open];
    let args = NEWLINE_RUN_RE.replace_all(&reply[open + 1..close], " ");
    Some(format!("{}({})", name, args))
}

/// Byte index of the `)` closing the `(` at `open`. Parentheses inside quoted
/// strings are ignored.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reformats invalid call text through a secondary model invocation.
pub struct CallRepairer {
    client: Arc<dyn ModelClient>,
    signatures: String,
}

impl CallRepairer {
    pub fn new(client: Arc<dyn ModelClient>, signatures: impl Into<String>) -> Self {
        Self {
            client,
            signatures: signatures.into(),
        }
    }

    /// One repair round trip. No retries: a failed request or a reply without a
    /// call-shaped span is returned as an error carrying no tool name.
    pub async fn repair(&self, text: &str) -> Result<String, ToolExecutionError> {
        debug!(len = text.len(), "requesting call repair");
        let prompt = repair_prompt(&self.signatures, text);
        let reply = self
            .client
            .invoke(REPAIR_INSTRUCTION, &[Message::human(prompt)])
            .await
            .map_err(|e| {
                ToolExecutionError::new(None, format!("call repair request failed: {}", e))
                    .with_source(e)
            })?;

        let reply_text = reply.plain_text();
        match extract_call_span(&reply_text) {
            Some(call) => {
                debug!(%call, "repaired call");
                Ok(call)
            }
            None => {
                warn!("repair reply contained no call expression");
                Err(ToolExecutionError::new(
                    None,
                    format!(
                        "Could not turn the response into a tool call. Original text:\n{}",
                        text
                    ),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ReplayClient;

    #[test]
    fn extracts_call_from_prose() {
        assert_eq!(
            extract_call_span("Sure, here it is: read_file('a.txt')").as_deref(),
            Some("read_file('a.txt')")
        );
    }

    #[test]
    fn collapses_newlines_in_arguments() {
        assert_eq!(
            extract_call_span("write(\n    'a.txt',\n    'body'\n)").as_deref(),
            Some("write( 'a.txt', 'body' )")
        );
    }

    #[test]
    fn keeps_dotted_names() {
        assert_eq!(
            extract_call_span("fs.read(path='x')").as_deref(),
            Some("fs.read(path='x')")
        );
    }

    #[test]
    fn trailing_prose_with_parentheses_is_left_out() {
        let span =
            extract_call_span("read_file('a.txt')\n\nThis reads the file (as requested).").unwrap();
        assert_eq!(span, "read_file('a.txt')");
        assert!(crate::call::validate_call(&span));
    }

    #[test]
    fn quoted_parentheses_do_not_close_the_call() {
        assert_eq!(
            extract_call_span("note(text=') tricky (') then more (words)").as_deref(),
            Some("note(text=') tricky (')")
        );
        assert_eq!(
            extract_call_span("f(g(1), \"a\\\"b)\") done").as_deref(),
            Some("f(g(1), \"a\\\"b)\")")
        );
    }

    #[test]
    fn unbalanced_call_runs_to_last_paren() {
        assert_eq!(extract_call_span("f('open) end").as_deref(), Some("f('open)"));
    }

    #[test]
    fn no_call_shape_yields_none() {
        assert_eq!(extract_call_span("I cannot do that."), None);
        assert_eq!(extract_call_span("(unnamed)"), None);
    }

    #[tokio::test]
    async fn repair_returns_extracted_call_and_sends_signatures() {
        let client = Arc::new(ReplayClient::new(["```\nread_file(path='a.txt')\n```"]));
        let repairer = CallRepairer::new(client.clone(), "read_file(path)");
        let call = repairer.repair("please read a.txt").await.unwrap();
        assert_eq!(call, "read_file(path='a.txt')");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instruction, REPAIR_INSTRUCTION);
        let sent = requests[0].messages[0].text();
        assert!(sent.contains("read_file(path)"));
        assert!(sent.contains("please read a.txt"));
    }

    #[tokio::test]
    async fn repair_without_call_span_is_fatal_and_unnamed() {
        let client = Arc::new(ReplayClient::new(["no idea"]));
        let repairer = CallRepairer::new(client, "read_file(path)");
        let err = repairer.repair("gibberish").await.unwrap_err();
        assert!(err.tool_name.is_none());
        assert!(err.message.contains("gibberish"));
    }

    #[tokio::test]
    async fn client_failure_surfaces_as_execution_error() {
        let client = Arc::new(ReplayClient::new(Vec::<String>::new()));
        let repairer = CallRepairer::new(client, "");
        let err = repairer.repair("x").await.unwrap_err();
        assert!(err.tool_name.is_none());
        assert!(err.message.contains("repair request failed"));
    }
}
