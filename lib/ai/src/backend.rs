//! Model backend abstraction.
//!
//! Provides a unified streaming interface over tool-calling chat models. The
//! wire protocol of a concrete provider lives with the binary that talks to it.

use crate::error::LlmError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use sqlscout_conversation::{Message, ToolDefinition};

/// Whether the model may answer in text or must call a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides.
    #[default]
    Auto,
    /// The model must call one of the declared tools.
    Forced,
}

/// A request to a chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The messages to send, oldest first.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Tool choice constraint.
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    /// Creates a new request without tools.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Declares tools the model may call.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Requires the model to call one of the declared tools.
    #[must_use]
    pub fn forcing_tool_call(mut self) -> Self {
        self.tool_choice = ToolChoice::Forced;
        self
    }
}

/// An incremental piece of a streamed reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// A fragment of reply text.
    Text { text: String },
    /// The start of a tool call at position `index`.
    ToolCallStart {
        index: usize,
        id: String,
        name: String,
    },
    /// A fragment of the JSON arguments of the tool call at `index`.
    ToolCallDelta { index: usize, partial_json: String },
}

impl StreamChunk {
    /// Creates a text chunk.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a tool call start chunk.
    #[must_use]
    pub fn tool_call_start(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ToolCallStart {
            index,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Creates a tool call arguments chunk.
    #[must_use]
    pub fn tool_call_delta(index: usize, partial_json: impl Into<String>) -> Self {
        Self::ToolCallDelta {
            index,
            partial_json: partial_json.into(),
        }
    }
}

/// A stream of reply chunks.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, LlmError>>;

/// Trait for model backends.
///
/// This trait defines the interface that all model providers must implement.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Starts a streamed reply for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be started. Failures after the
    /// first chunk arrive as stream items.
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_builder() {
        let request = ChatRequest::new(vec![Message::user("How many rows?")])
            .with_tools(vec![ToolDefinition::new("sql_db_query", "Run a query")])
            .forcing_tool_call();

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.tools[0].name, "sql_db_query");
        assert_eq!(request.tool_choice, ToolChoice::Forced);
    }

    #[test]
    fn tool_choice_defaults_to_auto() {
        let request = ChatRequest::new(Vec::new());
        assert_eq!(request.tool_choice, ToolChoice::Auto);
    }

    #[test]
    fn stream_chunk_serde() {
        let chunk = StreamChunk::tool_call_delta(0, r#"{"query": "SEL"#);
        let json = serde_json::to_string(&chunk).expect("serialize");
        assert!(json.contains(r#""type":"tool_call_delta""#));

        let parsed: StreamChunk = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(chunk, parsed);
    }
}
