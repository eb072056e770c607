//! SQL agent for sqlscout.
//!
//! This crate provides the agent that answers questions against a database:
//!
//! - **Nodes**: the six steps of a run and the transition table between them
//! - **Executor**: `SqlAgent`, which walks the nodes under a step budget
//! - **Extraction**: recovers executed SQL from streamed tool arguments
//! - **Driver**: streams thinking and answer text to a live display and
//!   keeps per-session memory

pub mod agent;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod events;
pub mod extract;
pub mod node;
pub mod run_state;

#[cfg(test)]
mod testing;

pub use agent::SqlAgent;
pub use config::AgentConfig;
pub use context::AgentContext;
pub use driver::{AskError, LiveDisplay, SessionDriver, Transcript, ask};
pub use error::{AgentError, ExtractionError};
pub use events::{IgnoreEvents, RunObserver, StreamEvent};
pub use extract::{extract_all, extract_latest};
pub use node::{AgentNode, Transition};
pub use run_state::AgentRunState;
