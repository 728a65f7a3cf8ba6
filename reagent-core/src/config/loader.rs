use super::app::{AgentSettings, AppConfig, ModelConfig, RetrySettings};
use super::defaults::*;
use super::error::ConfigError;
use super::server::{McpServerConfig, RawServer};
use crate::constants::{CONFIG_PATH, ENV_PATH};
use dotenvy::from_filename;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    model: RawModel,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    retry: RawRetry,
    #[serde(default)]
    servers: Vec<RawServer>,
}

#[derive(Debug, Deserialize, Default)]
struct RawModel {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
    api_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAgent {
    max_steps: Option<usize>,
    language: Option<String>,
    #[serde(default)]
    require_confirmation: bool,
    confirmation_exempt: Option<Vec<String>>,
    extra_instructions: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawRetry {
    attempts: Option<u32>,
    timeout_secs: Option<u64>,
    wait_secs: Option<u64>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<AppConfig, ConfigError> {
    let model = parsed.model.model.ok_or(ConfigError::MissingModel)?;
    let endpoint = parsed.model.endpoint.ok_or(ConfigError::MissingEndpoint)?;
    let api_key = resolve_api_key(parsed.model.api_key, parsed.model.api_key_env);

    if parsed.agent.max_steps == Some(0) {
        return Err(ConfigError::ZeroMaxSteps);
    }

    let mut seen = HashSet::new();
    let mut servers = Vec::with_capacity(parsed.servers.len());
    for raw in parsed.servers {
        let server = McpServerConfig::try_from(raw)?;
        if !seen.insert(server.name.clone()) {
            return Err(ConfigError::DuplicateServer {
                server: server.name,
            });
        }
        servers.push(server);
    }

    Ok(AppConfig {
        model: ModelConfig {
            endpoint: expand(&endpoint),
            model,
            api_key,
            api_path: parsed
                .model
                .api_path
                .unwrap_or_else(|| DEFAULT_API_PATH.to_string()),
        },
        agent: AgentSettings {
            max_steps: parsed.agent.max_steps,
            language: parsed
                .agent
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            require_confirmation: parsed.agent.require_confirmation,
            confirmation_exempt: parsed.agent.confirmation_exempt.unwrap_or_else(|| {
                DEFAULT_CONFIRMATION_EXEMPT
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            }),
            extra_instructions: parsed.agent.extra_instructions,
        },
        retry: RetrySettings {
            attempts: parsed.retry.attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            timeout_secs: parsed
                .retry
                .timeout_secs
                .unwrap_or(DEFAULT_RETRY_TIMEOUT_SECS),
            wait_secs: parsed.retry.wait_secs.unwrap_or(DEFAULT_RETRY_WAIT_SECS),
        },
        servers,
    })
}

/// A literal key wins; otherwise the named environment variable is read.
fn resolve_api_key(literal: Option<String>, env_name: Option<String>) -> Option<String> {
    if let Some(key) = literal.map(|k| expand(&k)).filter(|k| !k.trim().is_empty()) {
        return Some(key);
    }
    let env_name = env_name.unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
    std::env::var(&env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
