//! SQLite implementation of [`SqlDatabase`].

use crate::database::{QueryRows, SqlDatabase};
use crate::error::DatabaseError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteColumn, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Default number of sample rows included in table descriptions.
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

/// A SQLite database shared across runs.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
    sample_rows: usize,
}

impl SqliteDatabase {
    /// Opens the database at `url` in read-only mode.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connectivity` if the file cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DatabaseError::Connectivity {
                reason: e.to_string(),
            })?
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connectivity {
                reason: e.to_string(),
            })?;
        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }

    /// Sets how many sample rows each table description includes.
    #[must_use]
    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    async fn create_statement(&self, table: &str) -> Result<Option<String>, DatabaseError> {
        let ddl: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(ddl)
    }

    async fn sample(&self, table: &str) -> Result<QueryRows, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_identifier(table),
            self.sample_rows
        );
        self.fetch(&sql).await
    }

    /// Runs `sql`, taking column names from the prepared statement when no
    /// row comes back.
    async fn fetch(&self, sql: &str) -> Result<QueryRows, DatabaseError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let mut result = rows_to_result(&rows)?;
        if rows.is_empty() {
            let statement = (&self.pool).prepare(sql).await?;
            result.columns = column_names(statement.columns());
        }
        Ok(result)
    }
}

fn column_names(columns: &[SqliteColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<JsonValue, DatabaseError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => JsonValue::from(row.try_get::<i64, _>(index)?),
        "REAL" | "NUMERIC" => JsonValue::from(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            JsonValue::String(format!("<{} bytes>", bytes.len()))
        }
        _ => JsonValue::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

fn rows_to_result(rows: &[SqliteRow]) -> Result<QueryRows, DatabaseError> {
    let columns = rows
        .first()
        .map(|row| column_names(row.columns()))
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| decode_value(row, i))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryRows { columns, rows })
}

fn render_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_sample(table: &str, sample: &QueryRows) -> String {
    let mut out = format!("/*\n{} rows from {table} table:\n", sample.rows.len());
    out.push_str(&sample.columns.join("\t"));
    out.push('\n');
    for row in &sample.rows {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out.push_str("*/");
    out
}

#[async_trait]
impl SqlDatabase for SqliteDatabase {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self))]
    async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        debug!(count = names.len(), "listed tables");
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn table_info(&self, tables: &[String]) -> Result<String, DatabaseError> {
        let mut sections = Vec::with_capacity(tables.len());
        let mut missing = Vec::new();
        for table in tables {
            match self.create_statement(table).await? {
                Some(ddl) => {
                    let mut section = ddl.trim().to_string();
                    if self.sample_rows > 0 {
                        let sample = self.sample(table).await?;
                        section.push_str("\n\n");
                        section.push_str(&render_sample(table, &sample));
                    }
                    sections.push(section);
                }
                None => missing.push(table.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(DatabaseError::UnknownTable { names: missing });
        }
        Ok(sections.join("\n\n"))
    }

    #[instrument(skip(self))]
    async fn query(&self, sql: &str) -> Result<QueryRows, DatabaseError> {
        let result = self.fetch(sql).await?;
        debug!(rows = result.rows.len(), "query returned");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqliteDatabase {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory database");
        sqlx::query("CREATE TABLE orders (id INTEGER PRIMARY KEY, item TEXT, amount REAL)")
            .execute(&pool)
            .await
            .expect("create orders");
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(&pool)
            .await
            .expect("create users");
        for (item, amount) in [("apple", 1.5), ("pear", 2.0), ("plum", 0.5), ("fig", 3.0)] {
            sqlx::query("INSERT INTO orders (item, amount) VALUES (?, ?)")
                .bind(item)
                .bind(amount)
                .execute(&pool)
                .await
                .expect("insert order");
        }
        SqliteDatabase::from_pool(pool)
    }

    #[tokio::test]
    async fn lists_tables_in_name_order() {
        let db = seeded().await;
        let names = db.table_names().await.expect("list tables");
        assert_eq!(names, vec!["orders", "users"]);
    }

    #[tokio::test]
    async fn table_info_includes_ddl_and_samples() {
        let db = seeded().await;
        let info = db
            .table_info(&["orders".to_string()])
            .await
            .expect("table info");

        assert!(info.starts_with("CREATE TABLE orders"));
        assert!(info.contains("3 rows from orders table:"));
        assert!(info.contains("id\titem\tamount"));
        assert!(info.contains("1\tapple\t1.5"));
        assert!(!info.contains("fig"));
    }

    #[tokio::test]
    async fn table_info_reports_unknown_tables() {
        let db = seeded().await;
        let err = db
            .table_info(&["orders".to_string(), "nope".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DatabaseError::UnknownTable {
                names: vec!["nope".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn query_decodes_typed_columns() {
        let db = seeded().await;
        let rows = db
            .query("SELECT COUNT(*) AS n, MAX(amount) AS top, MIN(item) AS first, NULL AS empty FROM orders")
            .await
            .expect("query");

        assert_eq!(rows.columns, vec!["n", "top", "first", "empty"]);
        assert_eq!(
            rows.rows,
            vec![vec![
                serde_json::json!(4),
                serde_json::json!(3.0),
                serde_json::json!("apple"),
                JsonValue::Null,
            ]]
        );
    }

    #[tokio::test]
    async fn empty_result_keeps_column_names() {
        let db = seeded().await;
        let rows = db
            .query("SELECT item, amount FROM orders WHERE amount > 100")
            .await
            .expect("query");

        assert_eq!(rows.columns, vec!["item", "amount"]);
        assert!(rows.rows.is_empty());
    }

    #[tokio::test]
    async fn query_errors_are_not_connectivity() {
        let db = seeded().await;
        let err = db.query("SELECT missing FROM orders").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query { .. }));
    }

    #[tokio::test]
    async fn file_database_is_opened_read_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reports.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let writer = SqlitePool::connect(&url).await.expect("create file database");
        sqlx::query("CREATE TABLE reports (id INTEGER PRIMARY KEY)")
            .execute(&writer)
            .await
            .expect("create table");
        writer.close().await;

        let db = SqliteDatabase::connect(&format!("sqlite://{}", path.display()))
            .await
            .expect("open read-only");
        assert_eq!(db.table_names().await.expect("list"), vec!["reports"]);

        let err = db.query("INSERT INTO reports (id) VALUES (1)").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query { .. }));
    }
}
