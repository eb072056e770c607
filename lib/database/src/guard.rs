//! Read-only statement guard.
//!
//! Every statement is parsed before it reaches the database. Only a single
//! query statement is accepted, and its body may not write through
//! `SELECT ... INTO`, nested `INSERT`/`UPDATE`, or row locks.
//!
//! Dialect syntax the parser does not know, such as SQLite's `GLOB` or
//! `LIMIT offset, count`, falls back to a token-level check. The database
//! connection is opened read-only, so that check only has to keep obvious
//! writes and stacked statements away from it.

use crate::error::DatabaseError;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{self, Dialect, GenericDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

const QUERY_KEYWORDS: [&str; 3] = ["SELECT", "WITH", "VALUES"];

const WRITE_KEYWORDS: [&str; 11] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "ATTACH", "DETACH", "PRAGMA",
    "VACUUM", "REINDEX",
];

fn forbidden(sql: &str, reason: impl Into<String>) -> DatabaseError {
    DatabaseError::ForbiddenStatement {
        sql: sql.to_string(),
        reason: reason.into(),
    }
}

/// Checks that `sql` is exactly one read-only query in the given dialect.
///
/// Unknown dialect names fall back to a generic SQL grammar.
///
/// # Errors
///
/// Returns `DatabaseError::ForbiddenStatement` if the text holds more than one
/// statement or anything but a read-only query, and `DatabaseError::Query` if
/// it is not recognisable as a query at all.
pub fn ensure_read_only(dialect_name: &str, sql: &str) -> Result<(), DatabaseError> {
    let dialect: Box<dyn Dialect> =
        dialect::dialect_from_str(dialect_name).unwrap_or_else(|| Box::new(GenericDialect {}));
    let statements = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(parse_error) => {
            debug!(error = %parse_error, "parser rejected SQL, checking tokens");
            return check_tokens(dialect.as_ref(), sql, &parse_error.to_string());
        }
    };

    match statements.as_slice() {
        [] => Err(forbidden(sql, "empty statement")),
        [Statement::Query(query)] => check_query(sql, query),
        [_] => Err(forbidden(sql, "only SELECT statements are allowed")),
        _ => Err(forbidden(sql, "only a single statement is allowed")),
    }
}

/// Accepts text the parser could not read if it is one statement that starts
/// like a query and names no writing keyword.
fn check_tokens(dialect: &dyn Dialect, sql: &str, parse_error: &str) -> Result<(), DatabaseError> {
    let unparseable = || DatabaseError::Query {
        reason: format!("failed to parse SQL: {parse_error}"),
    };
    let tokens = Tokenizer::new(dialect, sql)
        .tokenize()
        .map_err(|_| unparseable())?;
    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
        .collect();

    let body = match significant.iter().position(|token| **token == Token::SemiColon) {
        Some(end) if significant[end..].iter().any(|t| **t != Token::SemiColon) => {
            return Err(forbidden(sql, "only a single statement is allowed"));
        }
        Some(end) => &significant[..end],
        None => significant.as_slice(),
    };

    let keywords: Vec<String> = body
        .iter()
        .filter_map(|token| match token {
            Token::Word(word) if word.quote_style.is_none() => {
                Some(word.value.to_ascii_uppercase())
            }
            _ => None,
        })
        .collect();
    if let Some(keyword) = keywords
        .iter()
        .find(|k| WRITE_KEYWORDS.contains(&k.as_str()))
    {
        return Err(forbidden(sql, format!("{keyword} is not allowed")));
    }
    match body.first() {
        Some(Token::Word(word))
            if word.quote_style.is_none()
                && QUERY_KEYWORDS.contains(&word.value.to_ascii_uppercase().as_str()) =>
        {
            Ok(())
        }
        Some(_) => Err(unparseable()),
        None => Err(forbidden(sql, "empty statement")),
    }
}

fn check_query(sql: &str, query: &Query) -> Result<(), DatabaseError> {
    if !query.locks.is_empty() {
        return Err(forbidden(sql, "row locking clauses are not allowed"));
    }
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(sql, &cte.query)?;
        }
    }
    check_set_expr(sql, &query.body)
}

fn check_set_expr(sql: &str, body: &SetExpr) -> Result<(), DatabaseError> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                Err(forbidden(sql, "SELECT INTO creates a table"))
            } else {
                Ok(())
            }
        }
        SetExpr::Query(query) => check_query(sql, query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(sql, left)?;
            check_set_expr(sql, right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        _ => Err(forbidden(sql, "data modification is not allowed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_forbidden(sql: &str) {
        let result = ensure_read_only("sqlite", sql);
        assert!(
            matches!(result, Err(DatabaseError::ForbiddenStatement { .. })),
            "expected {sql:?} to be rejected, got {result:?}"
        );
    }

    #[test]
    fn accepts_plain_select() {
        assert!(ensure_read_only("sqlite", "SELECT COUNT(*) FROM orders").is_ok());
        assert!(ensure_read_only("sqlite", "select name from users limit 10;").is_ok());
    }

    #[test]
    fn accepts_compound_and_cte_queries() {
        assert!(
            ensure_read_only(
                "sqlite",
                "WITH recent AS (SELECT * FROM orders WHERE day > '2020-01-01') \
                 SELECT COUNT(*) FROM recent UNION ALL SELECT 0"
            )
            .is_ok()
        );
    }

    #[test]
    fn rejects_mutating_statements() {
        assert_forbidden("INSERT INTO orders VALUES (1)");
        assert_forbidden("UPDATE orders SET amount = 0");
        assert_forbidden("DELETE FROM orders");
        assert_forbidden("DROP TABLE orders");
        assert_forbidden("ALTER TABLE orders ADD COLUMN note TEXT");
        assert_forbidden("CREATE TABLE t (id INTEGER)");
    }

    #[test]
    fn rejects_stacked_statements() {
        assert_forbidden("SELECT 1; DROP TABLE orders");
    }

    #[test]
    fn accepts_sqlite_syntax_the_parser_lacks() {
        for sql in [
            "SELECT name FROM t WHERE name GLOB 'A*'",
            "SELECT a FROM t WHERE b IS NOT c",
            "SELECT x FROM t LIMIT 2, 5",
            "SELECT x FROM t LIMIT 2, 5;",
        ] {
            let result = ensure_read_only("sqlite", sql);
            assert!(result.is_ok(), "expected {sql:?} to pass, got {result:?}");
        }
    }

    #[test]
    fn unparseable_writes_are_still_forbidden() {
        assert_forbidden("WITH x AS (SELECT 1) DELETE FROM t WHERE name GLOB 'A*'");
        assert_forbidden("SELECT x FROM t LIMIT 2, 5; DROP TABLE t");
    }

    #[test]
    fn garbage_is_a_query_failure_not_forbidden() {
        let result = ensure_read_only("sqlite", "SELEC * FORM orders");
        assert!(
            matches!(result, Err(DatabaseError::Query { .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn rejects_empty_text() {
        assert_forbidden("");
    }

    #[test]
    fn rejects_select_into() {
        let result = ensure_read_only("postgresql", "SELECT * INTO backup FROM orders");
        assert!(matches!(
            result,
            Err(DatabaseError::ForbiddenStatement { .. })
        ));
    }

    #[test]
    fn unknown_dialect_falls_back_to_generic() {
        assert!(ensure_read_only("made-up", "SELECT 1").is_ok());
        assert!(ensure_read_only("made-up", "DELETE FROM t").is_err());
    }
}
