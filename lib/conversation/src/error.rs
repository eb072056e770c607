//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ToolError`: Errors from tool execution
//! - `ConversationError`: Violations of the conversation ordering rules

use std::fmt;

/// Errors from tool execution.
///
/// Every variant except `Connectivity` is reported back to the model as the
/// tool's result content so it can correct itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool not found.
    NotFound { name: String },
    /// Invalid tool input.
    InvalidInput { name: String, reason: String },
    /// The statement is not a read-only query.
    ForbiddenStatement { sql: String, reason: String },
    /// One or more requested tables do not exist.
    UnknownTable { names: Vec<String> },
    /// The database could not be reached.
    Connectivity { reason: String },
    /// The database rejected or failed the statement.
    QueryFailed { reason: String },
}

impl ToolError {
    /// Returns true if this error must abort the run instead of being shown
    /// to the model.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "tool not found: {name}"),
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
            Self::ForbiddenStatement { sql, reason } => {
                write!(f, "forbidden statement ({reason}): {sql}")
            }
            Self::UnknownTable { names } => {
                write!(f, "table_names {{{}}} not found in database", names.join(", "))
            }
            Self::Connectivity { reason } => {
                write!(f, "database unreachable: {reason}")
            }
            Self::QueryFailed { reason } => write!(f, "query failed: {reason}"),
        }
    }
}

impl std::error::Error for ToolError {}

/// Violations of the conversation ordering rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A tool result has no earlier tool call with the same identifier.
    OrphanToolResult { tool_call_id: String },
    /// A tool message is missing its result payload.
    InvalidMessage { reason: String },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanToolResult { tool_call_id } => {
                write!(f, "tool result '{tool_call_id}' has no matching tool call")
            }
            Self::InvalidMessage { reason } => write!(f, "invalid message: {reason}"),
        }
    }
}

impl std::error::Error for ConversationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_display() {
        let err = ToolError::InvalidInput {
            name: "sql_db_query".to_string(),
            reason: "missing 'query'".to_string(),
        };
        assert!(err.to_string().contains("sql_db_query"));
        assert!(err.to_string().contains("missing 'query'"));
    }

    #[test]
    fn unknown_table_lists_names() {
        let err = ToolError::UnknownTable {
            names: vec!["orders".to_string(), "users".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "table_names {orders, users} not found in database"
        );
    }

    #[test]
    fn only_connectivity_is_fatal() {
        assert!(ToolError::Connectivity { reason: "refused".to_string() }.is_fatal());
        assert!(
            !ToolError::ForbiddenStatement {
                sql: "DROP TABLE x".to_string(),
                reason: "not a query".to_string(),
            }
            .is_fatal()
        );
        assert!(!ToolError::QueryFailed { reason: "syntax".to_string() }.is_fatal());
    }

    #[test]
    fn conversation_error_display() {
        let err = ConversationError::OrphanToolResult {
            tool_call_id: "call_1".to_string(),
        };
        assert!(err.to_string().contains("call_1"));
    }
}
