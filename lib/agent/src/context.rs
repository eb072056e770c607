//! Process-wide collaborators shared by every run.

use crate::config::AgentConfig;
use crate::error::AgentError;
use sqlscout_core::Result;
use serde_json::Value as JsonValue;
use sqlscout_ai::{LlmBackend, query_checker_prompt, query_generator_prompt};
use sqlscout_conversation::{Tool, ToolDefinition, ToolRegistry};
use sqlscout_database::{LIST_TABLES_TOOL, QUERY_TOOL, SCHEMA_TOOL, SqlDatabase, sql_toolkit};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a run needs, built once per process.
///
/// Tools are resolved and prompts rendered at construction, so a run never
/// looks anything up by name except the calls the model makes.
pub struct AgentContext {
    pub(crate) backend: Arc<dyn LlmBackend>,
    pub(crate) tools: ToolRegistry,
    pub(crate) list_tables: Arc<dyn Tool>,
    pub(crate) schema_definition: ToolDefinition,
    pub(crate) query_definition: ToolDefinition,
    pub(crate) generator_prompt: String,
    pub(crate) checker_prompt: String,
    pub(crate) config: AgentConfig,
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("model", &self.backend.model())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn configuration(reason: impl fmt::Display) -> AgentError {
    AgentError::Configuration {
        reason: reason.to_string(),
    }
}

impl AgentContext {
    /// Builds the context over the standard SQL toolkit for `database`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Configuration` if a prompt cannot be rendered.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        database: Arc<dyn SqlDatabase>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        let dialect = database.dialect().to_string();
        Self::with_tools(backend, sql_toolkit(database), &dialect, config)
    }

    /// Builds the context over an explicit tool registry.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Configuration` if one of the SQL tools is missing
    /// or a prompt cannot be rendered.
    pub fn with_tools(
        backend: Arc<dyn LlmBackend>,
        tools: ToolRegistry,
        dialect: &str,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        let list_tables = tools.require(LIST_TABLES_TOOL).map_err(configuration)?;
        let schema_definition = tools.require(SCHEMA_TOOL).map_err(configuration)?.definition();
        let query_definition = tools.require(QUERY_TOOL).map_err(configuration)?.definition();

        let variables: HashMap<String, JsonValue> = HashMap::from([
            ("dialect".to_string(), JsonValue::from(dialect)),
            ("top_k".to_string(), JsonValue::from(config.top_k)),
        ]);
        let generator_prompt = query_generator_prompt()
            .render_checked(&variables)
            .map_err(configuration)?;
        let checker_prompt = query_checker_prompt()
            .render_checked(&variables)
            .map_err(configuration)?;

        Ok(Self {
            backend,
            tools,
            list_tables,
            schema_definition,
            query_definition,
            generator_prompt,
            checker_prompt,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
