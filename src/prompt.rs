// ABOUTME: Leading instruction builder — assembles the fixed instruction sent with every prompt.
// ABOUTME: Compiles defaults from src/prompts/*.md, renders tool signatures, supports file overrides.

use std::fs;
use std::path::{Path, PathBuf};

/// Compiled-in default prompt layers.
const DEFAULT_AGENT: &str = include_str!("prompts/agent.md");
const DEFAULT_TOOLS: &str = include_str!("prompts/tools.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");

/// Instruction used for the secondary repair invocation.
pub const REPAIR_INSTRUCTION: &str =
    "You reformat malformed tool calls. Reply with exactly one call expression and nothing else.";

/// Reads a file if it exists, returning None otherwise.
pub fn read_if_exists(path: &Path) -> Option<String> {
    if path.exists() {
        fs::read_to_string(path).ok()
    } else {
        None
    }
}

/// Assembles the leading instruction from layered sources: agent rules, the
/// tool list, and an optional local addendum.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    pub agent: String,
    pub tools: String,
    pub local: Option<String>,
}

impl InstructionBuilder {
    /// Creates a new builder loaded with the compiled-in defaults.
    pub fn new() -> Self {
        Self {
            agent: DEFAULT_AGENT.to_string(),
            tools: DEFAULT_TOOLS.to_string(),
            local: None,
        }
    }

    /// Replaces the agent layer with `<dir>/agent.md` if present.
    pub fn load_overrides(&mut self, dir: &Path) -> &mut Self {
        if let Some(content) = read_if_exists(&dir.join("agent.md")) {
            self.agent = content;
        }
        self
    }

    /// Reads `.calloop.md` in the working directory into the local layer.
    pub fn load_local(&mut self) -> &mut Self {
        self.local = read_if_exists(&PathBuf::from(".calloop.md"));
        self
    }

    /// Concatenates all non-empty layers separated by `"\n\n"`, with the tool
    /// signatures substituted into the tools layer.
    pub fn build(&self, signatures: &str) -> String {
        let tools = self.tools.replace("{tools}", signatures);
        [
            Some(self.agent.as_str()),
            Some(tools.as_str()),
            self.local.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

impl Default for InstructionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The user message for a repair request.
pub fn repair_prompt(signatures: &str, text: &str) -> String {
    REPAIR_TEMPLATE
        .replace("{tools}", signatures)
        .replace("{text}", text)
}
