//! Message types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlscout_core::MessageId;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
    /// System message.
    System,
    /// Tool result message.
    Tool,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier. A superseding reply reuses the id it replaces.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Tool call information (for assistant messages).
    pub tool_calls: Vec<ToolCall>,
    /// Tool result (for tool messages).
    pub tool_result: Option<ToolResult>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a tool result message.
    #[must_use]
    pub fn tool(result: ToolResult) -> Self {
        let mut msg = Self::new(MessageRole::Tool, "");
        msg.tool_result = Some(result);
        msg
    }

    /// Adds a tool call.
    #[must_use]
    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_calls.push(tool_call);
        self
    }

    /// Replaces the message identifier.
    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    /// Returns true if this message has tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Returns the first tool call with the given name.
    #[must_use]
    pub fn tool_call_named(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|call| call.name == name)
    }

    /// Returns the text that represents this message to a model.
    ///
    /// Tool messages render their result; every other role renders its content.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.tool_result {
            Some(result) => result.content_text(),
            None => self.content.clone(),
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation identifier linking this call to its result.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: JsonValue,
}

impl ToolCall {
    /// Creates a new tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Returns a string argument by key.
    #[must_use]
    pub fn str_argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(JsonValue::as_str)
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The tool call ID this result is for.
    pub tool_call_id: String,
    /// The tool name.
    pub name: String,
    /// The result value: a string, or tabular rows as a JSON object.
    pub result: JsonValue,
    /// Error message if the tool failed.
    pub error: Option<String>,
}

impl ToolResult {
    /// Creates a successful tool result.
    #[must_use]
    pub fn success(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: JsonValue,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            result,
            error: None,
        }
    }

    /// Creates a failed tool result.
    #[must_use]
    pub fn failure(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            result: JsonValue::Null,
            error: Some(error.into()),
        }
    }

    /// Returns true if the tool call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Renders the result as plain text.
    #[must_use]
    pub fn content_text(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error: {error}");
        }
        match &self.result {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
