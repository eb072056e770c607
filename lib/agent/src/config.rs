//! Agent configuration.

use serde::{Deserialize, Serialize};
use sqlscout_conversation::DEFAULT_MEMORY_TURNS;

fn default_step_budget() -> usize {
    100
}

fn default_top_k() -> usize {
    10
}

fn default_memory_turns() -> usize {
    DEFAULT_MEMORY_TURNS
}

fn default_sample_rows() -> usize {
    3
}

/// Tunables for the agent and its session memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum node executions per run.
    #[serde(default = "default_step_budget")]
    pub step_budget: usize,
    /// Row limit the generator is told to apply unless the user asks otherwise.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Trailing memory messages carried into each run.
    #[serde(default = "default_memory_turns")]
    pub memory_turns: usize,
    /// Sample rows shown with each table schema.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            top_k: default_top_k(),
            memory_turns: default_memory_turns(),
            sample_rows: default_sample_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: AgentConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.step_budget, 100);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.memory_turns, 8);
        assert_eq!(config.sample_rows, 3);
    }

    #[test]
    fn partial_config_overrides() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"step_budget": 5, "top_k": 3}"#).expect("deserialize");
        assert_eq!(config.step_budget, 5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.memory_turns, 8);
    }
}
