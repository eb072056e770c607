//! Recovers executed SQL from raw tool argument text.
//!
//! The raw text is the concatenation of every streamed `sql_db_query`
//! argument fragment in a run. Each complete `{"query": "..."}` object in it
//! is one query, in the order it was generated.

use crate::error::ExtractionError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static QUERY_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*["']query["']\s*:\s*"(?:\\.|[^"\\])*"\s*\}"#)
        .expect("query fragment pattern is valid")
});

#[derive(Deserialize)]
struct QueryFragment {
    query: String,
}

/// Returns every query in `raw`, in appearance order.
///
/// # Errors
///
/// Returns `ExtractionError::MalformedFragment` for the first fragment that
/// matches the shape of a query payload but is not valid JSON.
pub fn extract_all(raw: &str) -> Result<Vec<String>, ExtractionError> {
    QUERY_FRAGMENT
        .find_iter(raw)
        .map(|m| {
            serde_json::from_str::<QueryFragment>(m.as_str())
                .map(|fragment| fragment.query)
                .map_err(|e| ExtractionError::MalformedFragment {
                    fragment: m.as_str().to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Returns the last query in `raw`, if any.
///
/// # Errors
///
/// Returns `ExtractionError::MalformedFragment` if any fragment is malformed.
pub fn extract_latest(raw: &str) -> Result<Option<String>, ExtractionError> {
    Ok(extract_all(raw)?.pop())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(sql: &str) -> String {
        serde_json::json!({ "query": sql }).to_string()
    }

    #[test]
    fn empty_input_has_no_latest() {
        assert_eq!(extract_latest(""), Ok(None));
        assert_eq!(extract_latest("no payload here"), Ok(None));
    }

    #[test]
    fn latest_of_three_is_the_third() {
        let raw = format!(
            "{}{}{}",
            fragment("SELECT 1"),
            fragment("SELECT 2"),
            fragment("SELECT 3")
        );

        assert_eq!(
            extract_all(&raw),
            Ok(vec![
                "SELECT 1".to_string(),
                "SELECT 2".to_string(),
                "SELECT 3".to_string()
            ])
        );
        assert_eq!(extract_latest(&raw), Ok(Some("SELECT 3".to_string())));
    }

    #[test]
    fn quotes_backslashes_and_newlines_survive() {
        let sql = "SELECT \"Country/Region\", 'a\\b'\nFROM t\nWHERE note = \"say \\\"hi\\\"\"";
        let raw = format!("noise {} more noise", fragment(sql));

        assert_eq!(extract_latest(&raw), Ok(Some(sql.to_string())));
    }

    #[test]
    fn spacing_around_key_is_tolerated() {
        let raw = r#"{ "query" : "SELECT name FROM users" }"#;
        assert_eq!(
            extract_latest(raw),
            Ok(Some("SELECT name FROM users".to_string()))
        );
    }

    #[test]
    fn incomplete_fragment_is_ignored() {
        let raw = format!("{}{{\"query\": \"SELECT par", fragment("SELECT 1"));
        assert_eq!(extract_latest(&raw), Ok(Some("SELECT 1".to_string())));
    }

    #[test]
    fn malformed_fragment_is_surfaced() {
        let raw = r#"{'query': "SELECT 1"}"#;
        let err = extract_latest(raw).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedFragment { .. }));
    }
}
