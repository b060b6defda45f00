// ABOUTME: Typed failures raised by the call grammar, dispatch table, and trimmers.
// ABOUTME: Collaborator seams and the binary use anyhow; these cover the core's own errors.

use thiserror::Error;

/// A call expression could not be tokenized or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct CallParseError {
    pub message: String,
    pub offset: usize,
}

impl CallParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Evaluating a parsed call against the dispatch table failed before the tool ran.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("name '{0}' is not defined")]
    UndefinedName(String),
    #[error("nested call to `{0}` is not allowed as an argument")]
    NestedCall(String),
    #[error("dictionary keys must be strings or numbers")]
    InvalidKey,
    #[error("number {0} cannot be represented")]
    InvalidNumber(f64),
    #[error(transparent)]
    Parse(#[from] CallParseError),
}

/// A tool call failed: evaluation, the tool itself, or repair.
///
/// `tool_name` is best-effort; it is `None` when no leading identifier could be
/// recovered (for example when repair found no call-shaped text at all).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolExecutionError {
    pub tool_name: Option<String>,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ToolExecutionError {
    pub fn new(tool_name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            tool_name,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Trimming options that are recognized but deliberately not implemented.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrimError {
    #[error("trim strategy `{0}` is not supported")]
    UnsupportedStrategy(&'static str),
    #[error("partial message trimming is not supported")]
    PartialTrimUnsupported,
}
