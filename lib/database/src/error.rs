//! Error types for the database crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `DatabaseError`: Database access and statement vetting

use sqlscout_conversation::ToolError;
use std::fmt;

/// Errors from database operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// The database could not be reached.
    Connectivity { reason: String },
    /// One or more requested tables do not exist.
    UnknownTable { names: Vec<String> },
    /// The statement is not a single read-only query.
    ForbiddenStatement { sql: String, reason: String },
    /// The database rejected or failed the statement.
    Query { reason: String },
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity { reason } => write!(f, "database unreachable: {reason}"),
            Self::UnknownTable { names } => {
                write!(f, "unknown tables: {}", names.join(", "))
            }
            Self::ForbiddenStatement { sql, reason } => {
                write!(f, "forbidden statement ({reason}): {sql}")
            }
            Self::Query { reason } => write!(f, "query failed: {reason}"),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connectivity {
                reason: err.to_string(),
            },
            other => Self::Query {
                reason: other.to_string(),
            },
        }
    }
}

impl From<DatabaseError> for ToolError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Connectivity { reason } => Self::Connectivity { reason },
            DatabaseError::UnknownTable { names } => Self::UnknownTable { names },
            DatabaseError::ForbiddenStatement { sql, reason } => {
                Self::ForbiddenStatement { sql, reason }
            }
            DatabaseError::Query { reason } => Self::QueryFailed { reason },
        }
    }
}
