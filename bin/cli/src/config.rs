//! Client configuration.
//!
//! Loaded via the `config` crate from environment variables, after merging a
//! `.env` file if one is present. Nested keys use `__`, so `MODEL__BASE_URL`
//! sets `model.base_url` and `AGENT__STEP_BUDGET` sets `agent.step_budget`.

use serde::Deserialize;
use sqlscout_agent::AgentConfig;

/// Client configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// SQLite connection URL, e.g. `sqlite://covid_19_report.db`.
    pub database_url: String,

    /// Chat model configuration.
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent tunables.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// An OpenAI-compatible chat completions endpoint.
#[derive(Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token. Local endpoints usually need none.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            temperature: 0.0,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from `.env` and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::default().source(Some(source))
    }

    #[test]
    fn model_config_has_correct_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_none());
        assert!(config.temperature.abs() < f32::EPSILON);
    }

    #[test]
    fn loads_nested_keys() {
        let config = AppConfig::from_source(environment(&[
            ("DATABASE_URL", "sqlite://test.db"),
            ("MODEL__BASE_URL", "http://localhost:11434/v1"),
            ("MODEL__MODEL", "llama3"),
            ("AGENT__STEP_BUDGET", "25"),
        ]))
        .expect("config loads");

        assert_eq!(config.database_url, "sqlite://test.db");
        assert_eq!(config.model.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model.model, "llama3");
        assert_eq!(config.agent.step_budget, 25);
        assert_eq!(config.agent.top_k, 10);
    }

    #[test]
    fn database_url_is_required() {
        assert!(AppConfig::from_source(environment(&[("MODEL__MODEL", "llama3")])).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ModelConfig {
            api_key: Some("sk-secret".to_string()),
            ..ModelConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
