//! Chat session memory.
//!
//! A session keeps the user questions and final answers of earlier runs.
//! Only a bounded suffix of that memory is handed to the next run.

use crate::message::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlscout_core::SessionId;

/// Number of trailing memory messages carried into a new run.
pub const DEFAULT_MEMORY_TURNS: usize = 8;

/// A chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Questions and answers from completed runs, oldest first.
    pub memory: Vec<Message>,
    /// How many trailing messages are carried into the next run.
    pub memory_turns: usize,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last completed a run.
    pub last_active_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_TURNS)
    }
}

impl Session {
    /// Creates a new session keeping `memory_turns` messages of history.
    #[must_use]
    pub fn new(memory_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            memory: Vec::new(),
            memory_turns,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Records a completed exchange, dropping messages older than
    /// `memory_turns`.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.memory.push(Message::user(question));
        self.memory.push(Message::assistant(answer));
        let excess = self.memory.len().saturating_sub(self.memory_turns);
        self.memory.drain(..excess);
        self.last_active_at = Utc::now();
    }

    /// Returns the bounded suffix of memory sent with the next question.
    #[must_use]
    pub fn recent_history(&self) -> &[Message] {
        let start = self.memory.len().saturating_sub(self.memory_turns);
        &self.memory[start..]
    }

    /// Forgets every recorded exchange.
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    /// Returns the number of remembered messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.memory.len()
    }
}
