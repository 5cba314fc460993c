use super::message::{ToolCall, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelContent {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// A flat role/content message as consumed by a model backend.
///
/// Tool results always travel in their own [`ModelRole::Tool`] message, directly after the
/// assistant message that requested them.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: Vec<ModelContent>,
}

impl ModelMessage {
    pub fn new(role: ModelRole) -> Self {
        Self {
            role,
            content: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: ModelContent) -> Self {
        self.content.push(content);
        self
    }

    /// Text parts joined with newlines, or None when there is no text at all
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|content| match content {
                ModelContent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|content| match content {
            ModelContent::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.content.iter().filter_map(|content| match content {
            ModelContent::ToolResult(result) => Some(result),
            _ => None,
        })
    }
}
