//! Model primitives for sqlscout.
//!
//! This crate provides:
//!
//! - **Backend**: a streaming chat interface over any tool-calling model
//! - **Assembler**: folds streamed chunks back into a conversation message
//! - **Prompts**: the generator and checker system prompts
//! - **Framing**: the incremental parser that splits reasoning from the final answer

pub mod assembler;
pub mod backend;
pub mod error;
pub mod framing;
pub mod prompt;

pub use assembler::ReplyAssembler;
pub use backend::{ChatRequest, ChunkStream, LlmBackend, StreamChunk, ToolChoice};
pub use error::{LlmError, PromptError};
pub use framing::{FramingParser, FramingPhase};
pub use prompt::{PromptTemplate, VariableDefinition, query_checker_prompt, query_generator_prompt};
