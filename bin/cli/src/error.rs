//! Startup and terminal errors for the client.

use std::fmt;

/// Errors that end the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration is missing or invalid.
    Config { reason: String },
    /// The database could not be opened.
    Database { reason: String },
    /// The model backend could not be created.
    Model { reason: String },
    /// The agent could not be assembled.
    Agent { reason: String },
    /// Reading the terminal failed.
    Terminal { reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Database { reason } => write!(f, "cannot open database: {reason}"),
            Self::Model { reason } => write!(f, "cannot create model backend: {reason}"),
            Self::Agent { reason } => write!(f, "cannot build agent: {reason}"),
            Self::Terminal { reason } => write!(f, "terminal error: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}
