// ABOUTME: Conversation message model — roles, text or block content, and tool-link ids.
// ABOUTME: Tool-link ids pair an assistant invocation with the tool-result that answers it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    Human,
    Assistant,
    ToolResult,
}

/// A structured content block for non-plain-text messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { media_type: String, data: String },
    Json { value: Value },
}

/// Message content: either plain text or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Blocks(blocks) => blocks.is_empty(),
        }
    }

    /// String form of the content. Block lists are rendered as JSON.
    pub fn to_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => serde_json::to_string(blocks).unwrap_or_default(),
        }
    }

    /// Only the prose: plain text as is, or the text blocks joined by newlines.
    /// Image and JSON blocks contribute nothing.
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// One unit of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_link_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::Text(text.into()),
            tool_link_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(Role::Human, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// An assistant message that invoked a tool.
    pub fn tool_invocation(text: impl Into<String>, link_id: impl Into<String>) -> Self {
        Self {
            tool_link_id: Some(link_id.into()),
            ..Self::assistant(text)
        }
    }

    /// The tool-result message answering the invocation with the same link id.
    pub fn tool_result(text: impl Into<String>, link_id: impl Into<String>) -> Self {
        Self {
            tool_link_id: Some(link_id.into()),
            ..Self::new(Role::ToolResult, text)
        }
    }

    pub fn text(&self) -> String {
        self.content.to_text()
    }

    /// See [`Content::plain_text`].
    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    pub fn is_tool_invocation(&self) -> bool {
        self.role == Role::Assistant && self.tool_link_id.is_some()
    }

    pub fn is_tool_result(&self) -> bool {
        self.role == Role::ToolResult && self.tool_link_id.is_some()
    }

    /// True if `self` is an invocation and `next` is the result carrying its link id.
    pub fn is_answered_by(&self, next: &Message) -> bool {
        self.is_tool_invocation() && next.is_tool_result() && self.tool_link_id == next.tool_link_id
    }
}
