//! Prompt templates.
//!
//! Templates use `{{variable}}` placeholders. The agent renders the query
//! generator and query checker prompts once per run with the database dialect.

use crate::error::PromptError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

const QUERY_GENERATOR: &str = r"You are an agent designed to interact with a SQL database.
Given an input question, create a syntactically correct {{dialect}} query to run,
then look at the results of the query and return the answer. Unless the user
specifies a specific number of examples they wish to obtain, always limit your
query to at most {{top_k}} results.

You can order the results by a relevant column to return the most interesting
examples in the database. Never query for all the columns from a specific table,
only ask for the relevant columns given the question.

DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.
If additional filters are provided (as a dictionary of column-value pairs),
you MUST include them in the WHERE clause using correct SQL syntax.

<reasoning> rules:
1. Wrap all detailed planning in a `<reasoning>...</reasoning>` block.
2. Inside each `<reasoning>`, describe in plain English:
   - Which table(s) you plan to query
   - Which column(s) you will select
   - How you will apply any filters
   - Any ordering or limits you will use
3. Do **NOT** include any actual SQL code inside `<reasoning>` blocks.
4. Use interleaved thinking: after invoking any tool or inspecting schema,
   open a new `<reasoning>` block to:
   - Reflect on the tool's output
   - Evaluate its correctness
   - Decide the next best action

<final_response> rule:
- After all `<reasoning>` blocks are closed, always wrap your complete, user-facing answer
  in a single `<final_response>...</final_response>` block.
- Inside `<final_response>`, fully answer the user's question by summarizing
  what the executed query returned.";

const QUERY_CHECKER: &str = r"You are a SQL expert with a strong attention to detail.
Double check the {{dialect}} query for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes,
just reproduce the original query.

You will call the appropriate tool to execute the query after running this check.";

/// Definition of a template variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Description of what this variable is for.
    pub description: String,
    /// Whether this variable is required.
    pub required: bool,
    /// Default value if not provided.
    pub default: Option<JsonValue>,
}

impl VariableDefinition {
    /// Creates a required variable definition.
    #[must_use]
    pub fn required(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Creates an optional variable definition.
    #[must_use]
    pub fn optional(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Sets a default value.
    #[must_use]
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A versioned prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Template content with placeholders.
    pub content: String,
    /// Variable definitions, keyed by name.
    pub variables: BTreeMap<String, VariableDefinition>,
}

fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

fn substitution(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            content: content.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds a variable definition.
    #[must_use]
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        definition: VariableDefinition,
    ) -> Self {
        self.variables.insert(name.into(), definition);
        self
    }

    /// Renders the template with the given variables.
    ///
    /// Placeholders without a value fall back to the variable's default and
    /// are otherwise left in place.
    #[must_use]
    pub fn render(&self, variables: &HashMap<String, JsonValue>) -> String {
        let mut result = self.content.clone();

        for (name, value) in variables {
            result = result.replace(&placeholder(name), &substitution(value));
        }

        for (name, def) in &self.variables {
            let placeholder = placeholder(name);
            if let Some(default) = &def.default
                && result.contains(&placeholder)
            {
                result = result.replace(&placeholder, &substitution(default));
            }
        }

        result
    }

    /// Validates that all required variables are provided.
    ///
    /// # Errors
    ///
    /// Returns the first missing variable, in name order.
    pub fn validate_variables(
        &self,
        variables: &HashMap<String, JsonValue>,
    ) -> Result<(), PromptError> {
        match self
            .variables
            .iter()
            .filter(|(_, def)| def.required && def.default.is_none())
            .find(|(name, _)| !variables.contains_key(*name))
        {
            Some((name, _)) => Err(PromptError::MissingVariable {
                template: self.name.clone(),
                variable: name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Validates, then renders.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariable` if a required variable is absent.
    pub fn render_checked(
        &self,
        variables: &HashMap<String, JsonValue>,
    ) -> Result<String, PromptError> {
        self.validate_variables(variables)?;
        Ok(self.render(variables))
    }
}

/// The system prompt for the query generation step.
///
/// Variables: `dialect` (required), `top_k` (defaults to 10).
#[must_use]
pub fn query_generator_prompt() -> PromptTemplate {
    PromptTemplate::new("query_generator", QUERY_GENERATOR)
        .with_variable("dialect", VariableDefinition::required("SQL dialect name"))
        .with_variable(
            "top_k",
            VariableDefinition::optional("Default row limit").with_default(serde_json::json!(10)),
        )
}

/// The system prompt for the query checking step.
///
/// Variables: `dialect` (required).
#[must_use]
pub fn query_checker_prompt() -> PromptTemplate {
    PromptTemplate::new("query_checker", QUERY_CHECKER)
        .with_variable("dialect", VariableDefinition::required("SQL dialect name"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, JsonValue)]) -> HashMap<String, JsonValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn template_with_defaults() {
        let template = PromptTemplate::new("greeting", "Hello, {{name}}! Your role is {{role}}.")
            .with_variable("name", VariableDefinition::required("User's name"))
            .with_variable(
                "role",
                VariableDefinition::optional("User's role")
                    .with_default(serde_json::json!("guest")),
            );

        let rendered = template.render(&vars(&[("name", serde_json::json!("Alice"))]));
        assert_eq!(rendered, "Hello, Alice! Your role is guest.");
    }

    #[test]
    fn template_validation() {
        let template = query_checker_prompt();

        let err = template.validate_variables(&HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingVariable {
                template: "query_checker".to_string(),
                variable: "dialect".to_string(),
            }
        );

        let ok = vars(&[("dialect", serde_json::json!("sqlite"))]);
        assert!(template.validate_variables(&ok).is_ok());
    }

    #[test]
    fn generator_prompt_renders_dialect_and_limit() {
        let rendered = query_generator_prompt()
            .render_checked(&vars(&[("dialect", serde_json::json!("sqlite"))]))
            .expect("render");

        assert!(rendered.contains("syntactically correct sqlite query"));
        assert!(rendered.contains("at most 10 results"));
        assert!(rendered.contains("<final_response>...</final_response>"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn generator_prompt_respects_top_k_override() {
        let rendered = query_generator_prompt().render(&vars(&[
            ("dialect", serde_json::json!("postgresql")),
            ("top_k", serde_json::json!(25)),
        ]));
        assert!(rendered.contains("at most 25 results"));
    }

    #[test]
    fn checker_prompt_lists_pitfalls() {
        let rendered = query_checker_prompt()
            .render_checked(&vars(&[("dialect", serde_json::json!("sqlite"))]))
            .expect("render");

        assert!(rendered.contains("Double check the sqlite query"));
        assert!(rendered.contains("NOT IN with NULL values"));
        assert!(rendered.contains("UNION ALL"));
        assert!(rendered.contains("just reproduce the original query"));
    }
}
