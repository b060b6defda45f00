// ABOUTME: Dispatcher — evaluates validated call text against the tool registry and runs it.
// ABOUTME: Handles duplicate suppression, typed failures, and tagged results for bundles.

use std::sync::{Arc, LazyLock};

use rand::Rng;
use regex::Regex;
use tracing::{debug, warn};

use super::registry::ToolRegistry;
use crate::agent::ExitSignal;
use crate::call::{CallArgs, DuplicateFilter, FilterDecision, ToolCallFingerprint, parse_single_call};
use crate::error::{EvalError, ToolExecutionError};

/// Returned in place of further results once the exit signal is observed.
pub const ABORTED_MESSAGE: &str = "Execution aborted: the agent is shutting down.";

const RESULT_ID_LEN: usize = 6;
const RESULT_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

static LEADING_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:```[^\n]*\n)?\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\(")
        .expect("leading name pattern is valid")
});

/// Best-effort tool name: the identifier directly before the first `(`.
pub fn leading_tool_name(code: &str) -> Option<String> {
    LEADING_NAME_RE
        .captures(code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Short random tag for one bundled result. Uniqueness is not guaranteed.
pub fn result_id() -> String {
    let mut rng = rand::rng();
    (0..RESULT_ID_LEN)
        .map(|_| RESULT_ID_CHARSET[rng.random_range(0..RESULT_ID_CHARSET.len())] as char)
        .collect()
}

pub fn wrap_result(id: &str, result: &str) -> String {
    format!("<result-{id}>\n{result}\n</result-{id}>")
}

/// Runs calls against a fixed [`ToolRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one call and return its raw result.
    ///
    /// Repeated calls to no-repeat tools return the rejection text as a normal
    /// result without running the tool.
    pub async fn execute(
        &self,
        code: &str,
        filter: &mut DuplicateFilter,
    ) -> Result<String, ToolExecutionError> {
        let call = parse_single_call(code).map_err(|e| failure(code, EvalError::from(e)))?;
        let Some(registration) = self.registry.get(&call.name) else {
            return Err(failure(code, EvalError::UnknownTool(call.name.clone())));
        };

        let fingerprint = ToolCallFingerprint::from_call(&call);
        if let FilterDecision::Reject(message) =
            filter.check(Some(fingerprint), registration.flags.no_repeat)
        {
            return Ok(message);
        }

        let args = CallArgs::from_call(&call).map_err(|e| failure(code, e))?;
        debug!(tool = %call.name, "executing tool call");
        registration.tool.call(args).await.map_err(|e| failure(code, e))
    }

    /// Execute bundled calls strictly in order, tagging each result.
    ///
    /// The exit signal is checked before every call; once set, the fixed
    /// [`ABORTED_MESSAGE`] is returned instead of any results. The first failing
    /// call stops the bundle and its error is returned.
    pub async fn execute_bundle(
        &self,
        calls: &[String],
        filter: &mut DuplicateFilter,
        exit: &ExitSignal,
    ) -> Result<String, ToolExecutionError> {
        let mut wrapped = Vec::with_capacity(calls.len());
        for code in calls {
            if exit.is_set() {
                warn!(
                    completed = wrapped.len(),
                    total = calls.len(),
                    "exit requested during bundle"
                );
                return Ok(ABORTED_MESSAGE.to_string());
            }
            let result = self.execute(code, filter).await?;
            wrapped.push(wrap_result(&result_id(), &result));
        }
        Ok(wrapped.join("\n\n"))
    }
}

fn failure<E>(code: &str, err: E) -> ToolExecutionError
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> + std::fmt::Display,
{
    let tool_name = leading_tool_name(code);
    let message = match &tool_name {
        Some(name) => format!("Error executing tool `{}`: {}\nCode:\n{}", name, err, code),
        None => format!("Error executing code: {}\nCode:\n{}", err, code),
    };
    ToolExecutionError::new(tool_name, message).with_source(err)
}
