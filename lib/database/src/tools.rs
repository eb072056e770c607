//! The SQL toolkit exposed to the model.

use crate::database::SqlDatabase;
use crate::guard::ensure_read_only;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlscout_conversation::{Tool, ToolDefinition, ToolError, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the list-tables tool.
pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
/// Name of the get-schema tool.
pub const SCHEMA_TOOL: &str = "sql_db_schema";
/// Name of the run-query tool.
pub const QUERY_TOOL: &str = "sql_db_query";

/// Lists every table in the database.
pub struct ListTablesTool {
    db: Arc<dyn SqlDatabase>,
}

impl ListTablesTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            LIST_TABLES_TOOL,
            "Input is an empty string, output is a comma-separated list of tables in the database.",
        )
    }

    async fn execute(&self, _input: JsonValue) -> Result<JsonValue, ToolError> {
        let names = self.db.table_names().await?;
        Ok(JsonValue::String(names.join(", ")))
    }
}

/// Describes the schema of the requested tables.
pub struct SchemaTool {
    db: Arc<dyn SqlDatabase>,
}

impl SchemaTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

/// Reads `table_names` as a comma-separated string or an array of strings.
fn requested_tables(input: &JsonValue) -> Result<Vec<String>, ToolError> {
    let invalid = |reason: &str| ToolError::InvalidInput {
        name: SCHEMA_TOOL.to_string(),
        reason: reason.to_string(),
    };
    let names: Vec<String> = match input.get("table_names") {
        Some(JsonValue::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| invalid("table_names must contain strings"))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid("table_names must be a string or an array")),
        None => return Err(invalid("missing 'table_names'")),
    };
    if names.is_empty() {
        return Err(invalid("table_names is empty"));
    }
    Ok(names)
}

#[async_trait]
impl Tool for SchemaTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SCHEMA_TOOL,
            "Input to this tool is a comma-separated list of tables, output is the schema and \
             sample rows for those tables. Be sure that the tables actually exist by calling \
             sql_db_list_tables first!",
        )
        .with_input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "A comma-separated list of the table names for which to return the schema. Example input: 'table1, table2, table3'"
                }
            },
            "required": ["table_names"]
        }))
    }

    async fn execute(&self, input: JsonValue) -> Result<JsonValue, ToolError> {
        let requested = requested_tables(&input)?;
        let known = self.db.table_names().await?;
        let missing: Vec<String> = requested
            .iter()
            .filter(|name| !known.contains(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "schema requested for unknown tables");
            return Err(ToolError::UnknownTable { names: missing });
        }
        let info = self.db.table_info(&requested).await?;
        Ok(JsonValue::String(info))
    }
}

/// Executes a read-only query.
///
/// Statements are vetted before the database is contacted.
pub struct QueryTool {
    db: Arc<dyn SqlDatabase>,
}

impl QueryTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            QUERY_TOOL,
            "Input to this tool is a detailed and correct SQL query, output is a result from \
             the database. If the query is not correct, an error message will be returned. \
             If an error is returned, rewrite the query, check the query, and try again.",
        )
        .with_input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A detailed and correct SQL query."
                }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, input: JsonValue) -> Result<JsonValue, ToolError> {
        let sql = input
            .get("query")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ToolError::InvalidInput {
                name: QUERY_TOOL.to_string(),
                reason: "missing 'query'".to_string(),
            })?;
        if let Err(err) = ensure_read_only(self.db.dialect(), sql) {
            warn!(%sql, "rejected statement");
            return Err(err.into());
        }
        let rows = self.db.query(sql).await?;
        serde_json::to_value(rows).map_err(|e| ToolError::QueryFailed {
            reason: e.to_string(),
        })
    }
}

/// Builds the registry of SQL tools over `db`.
#[must_use]
pub fn sql_toolkit(db: Arc<dyn SqlDatabase>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ListTablesTool::new(Arc::clone(&db))));
    registry.register(Arc::new(SchemaTool::new(Arc::clone(&db))));
    registry.register(Arc::new(QueryTool::new(db)));
    registry
}
