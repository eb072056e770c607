//! The ordered message history threaded through an agent run.

use crate::error::ConversationError;
use crate::message::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ordered sequence of messages.
///
/// Messages are only ever added. A message whose id matches an existing
/// message supersedes it in place, which keeps tool results directly after
/// the call they answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation seeded with prior turns.
    #[must_use]
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Adds a message, replacing any earlier message with the same id.
    ///
    /// Returns true if an existing message was superseded.
    pub fn supersede(&mut self, message: Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                *existing = message;
                true
            }
            None => {
                self.messages.push(message);
                false
            }
        }
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the last assistant message, if any.
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the conversation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Checks that every tool result follows a tool call with the same id.
    ///
    /// # Errors
    ///
    /// Returns the first result that has no preceding matching call.
    pub fn validate(&self) -> Result<(), ConversationError> {
        let mut seen_calls = HashSet::new();
        for message in &self.messages {
            for call in &message.tool_calls {
                seen_calls.insert(call.id.as_str());
            }
            if message.role == MessageRole::Tool {
                let result =
                    message
                        .tool_result
                        .as_ref()
                        .ok_or_else(|| ConversationError::InvalidMessage {
                            reason: format!("tool message {} has no result", message.id),
                        })?;
                if !seen_calls.contains(result.tool_call_id.as_str()) {
                    return Err(ConversationError::OrphanToolResult {
                        tool_call_id: result.tool_call_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
