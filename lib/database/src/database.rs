//! The database interface used by the SQL tools.

use crate::error::DatabaseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<JsonValue>>,
}

/// A relational database the agent can introspect and query.
///
/// Implementations are shared across runs and must not hold per-run state.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Returns the SQL dialect name, e.g. `sqlite`.
    fn dialect(&self) -> &str;

    /// Lists the user tables, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connectivity` if the database is unreachable.
    async fn table_names(&self) -> Result<Vec<String>, DatabaseError>;

    /// Describes the given tables: DDL followed by a few sample rows each.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownTable` if a table does not exist.
    async fn table_info(&self, tables: &[String]) -> Result<String, DatabaseError>;

    /// Executes a single statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Query` if the database rejects the statement.
    async fn query(&self, sql: &str) -> Result<QueryRows, DatabaseError>;
}
