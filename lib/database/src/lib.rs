//! Database collaborator for sqlscout.
//!
//! This crate provides:
//!
//! - **SqlDatabase**: the introspection and execution interface the agent needs
//! - **SqliteDatabase**: a read-only SQLite implementation over sqlx
//! - **Guard**: rejects every statement that is not a read-only query
//! - **Tools**: `sql_db_list_tables`, `sql_db_schema`, and `sql_db_query`

pub mod database;
pub mod error;
pub mod guard;
pub mod sqlite;
pub mod tools;

pub use database::{QueryRows, SqlDatabase};
pub use error::DatabaseError;
pub use guard::ensure_read_only;
pub use sqlite::SqliteDatabase;
pub use tools::{
    LIST_TABLES_TOOL, ListTablesTool, QUERY_TOOL, QueryTool, SCHEMA_TOOL, SchemaTool, sql_toolkit,
};
