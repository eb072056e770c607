//! Conversation model for sqlscout.
//!
//! This crate provides:
//!
//! - **Messages**: role-tagged messages carrying text, tool calls, or tool results
//! - **Conversation**: the ordered, append-only history threaded through a run
//! - **Tool Registry**: named capabilities resolved once at construction
//! - **Session**: the bounded memory carried between questions

pub mod conversation;
pub mod error;
pub mod message;
pub mod session;
pub mod tool;

pub use conversation::Conversation;
pub use error::{ConversationError, ToolError};
pub use message::{Message, MessageRole, ToolCall, ToolResult};
pub use session::{DEFAULT_MEMORY_TURNS, Session};
pub use tool::{Tool, ToolDefinition, ToolRegistry};
