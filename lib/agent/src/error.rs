//! Error types for the agent crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AgentError`: Failures that abort a run
//! - `ExtractionError`: Query fragments that cannot be decoded

use crate::node::AgentNode;
use std::fmt;

/// Errors that abort an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The run needed more node executions than allowed.
    StepBudgetExceeded { budget: usize },
    /// The database could not be reached.
    Connectivity { reason: String },
    /// The model call failed.
    ModelCall { node: AgentNode, reason: String },
    /// The model did not call the tool the node requires.
    MissingToolCall { node: AgentNode, tool: String },
    /// A tool call is missing a required argument.
    InvalidToolArguments { node: AgentNode, reason: String },
    /// The agent could not be assembled.
    Configuration { reason: String },
    /// The run was cancelled before `node` started.
    Cancelled { node: AgentNode },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepBudgetExceeded { budget } => {
                write!(f, "step budget of {budget} node executions exceeded")
            }
            Self::Connectivity { reason } => write!(f, "database unreachable: {reason}"),
            Self::ModelCall { node, reason } => {
                write!(f, "model call in {node} failed: {reason}")
            }
            Self::MissingToolCall { node, tool } => {
                write!(f, "model reply in {node} has no '{tool}' call")
            }
            Self::InvalidToolArguments { node, reason } => {
                write!(f, "invalid tool arguments in {node}: {reason}")
            }
            Self::Configuration { reason } => write!(f, "invalid agent setup: {reason}"),
            Self::Cancelled { node } => write!(f, "run cancelled before {node}"),
        }
    }
}

impl std::error::Error for AgentError {}

/// Errors from query extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A fragment looked like a query payload but did not decode.
    MalformedFragment { fragment: String, reason: String },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFragment { fragment, reason } => {
                write!(f, "malformed query fragment {fragment}: {reason}")
            }
        }
    }
}

impl std::error::Error for ExtractionError {}
