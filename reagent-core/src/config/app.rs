use super::error::ConfigError;
use super::server::McpServerConfig;
use crate::application::retry::RetryPolicy;
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from reagent.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub agent: AgentSettings,
    pub retry: RetrySettings,
    pub servers: Vec<McpServerConfig>,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        super::loader::parse_config(content, Path::new("<inline>"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// `None` means the loop only stops on a final answer.
    pub max_steps: Option<usize>,
    pub language: String,
    pub require_confirmation: bool,
    pub confirmation_exempt: Vec<String>,
    pub extra_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub attempts: u32,
    pub timeout_secs: u64,
    pub wait_secs: u64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts,
            Duration::from_secs(self.timeout_secs),
            Duration::from_secs(self.wait_secs),
        )
    }
}
