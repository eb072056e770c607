//! Folds streamed chunks into a complete assistant message.

use crate::backend::StreamChunk;
use crate::error::LlmError;
use serde_json::Value as JsonValue;
use sqlscout_conversation::{Message, ToolCall};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates one streamed reply.
///
/// Tool calls are keyed by their stream index, so argument fragments may
/// interleave across calls.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    text: String,
    calls: BTreeMap<usize, PendingCall>,
}

impl ReplyAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chunk.
    pub fn push(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Text { text } => self.text.push_str(text),
            StreamChunk::ToolCallStart { index, id, name } => {
                let call = self.calls.entry(*index).or_default();
                if !id.is_empty() {
                    call.id.clone_from(id);
                }
                if !name.is_empty() {
                    call.name.clone_from(name);
                }
            }
            StreamChunk::ToolCallDelta {
                index,
                partial_json,
            } => {
                self.calls
                    .entry(*index)
                    .or_default()
                    .arguments
                    .push_str(partial_json);
            }
        }
    }

    /// Builds the assistant message.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ResponseParseFailed` if a tool call has no name or
    /// its arguments are not a JSON object.
    pub fn finish(self) -> Result<Message, LlmError> {
        let mut message = Message::assistant(self.text);
        for (index, call) in self.calls {
            if call.name.is_empty() {
                return Err(LlmError::ResponseParseFailed {
                    reason: format!("tool call {index} has no name"),
                });
            }
            let arguments = if call.arguments.trim().is_empty() {
                JsonValue::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.arguments).map_err(|e| {
                    LlmError::ResponseParseFailed {
                        reason: format!("arguments of tool call '{}': {e}", call.name),
                    }
                })?
            };
            if !arguments.is_object() {
                return Err(LlmError::ResponseParseFailed {
                    reason: format!("arguments of tool call '{}' are not an object", call.name),
                });
            }
            let id = if call.id.is_empty() {
                format!("call_{index}")
            } else {
                call.id
            };
            message = message.with_tool_call(ToolCall::new(id, call.name, arguments));
        }
        Ok(message)
    }
}
