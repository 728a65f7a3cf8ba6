use super::defaults::DEFAULT_MCP_TIMEOUT_SECS;
use super::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

static REMOTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(https?|wss?)://").expect("literal regex"));

/// Where an MCP server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTarget {
    /// A local program speaking JSON-RPC over stdin/stdout.
    Command {
        command: PathBuf,
        args: Vec<String>,
        env: HashMap<String, String>,
        workdir: Option<PathBuf>,
    },
    /// A remote endpoint reached over SSE (`http(s)://`) or websocket (`ws(s)://`).
    Url {
        url: String,
        headers: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerConfig {
    pub name: String,
    pub target: ServerTarget,
    /// Bounds the handshake and tool listing; tool calls are not bounded.
    pub timeout: Duration,
}

impl McpServerConfig {
    pub fn command(name: impl Into<String>, command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            target: ServerTarget::Command {
                command: command.into(),
                args,
                env: HashMap::new(),
                workdir: None,
            },
            timeout: Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS),
        }
    }

    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ServerTarget::Url {
                url: url.into(),
                headers: HashMap::new(),
            },
            timeout: Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS),
        }
    }

    /// Command line or URL, for log lines.
    pub fn describe(&self) -> String {
        match &self.target {
            ServerTarget::Command { command, args, .. } => {
                let mut line = command.display().to_string();
                for arg in args {
                    line.push(' ');
                    line.push_str(arg);
                }
                line
            }
            ServerTarget::Url { url, .. } => url.clone(),
        }
    }
}

pub fn is_remote_url(value: &str) -> bool {
    REMOTE_URL.is_match(value.trim())
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    name: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl TryFrom<RawServer> for McpServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        let timeout = Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_MCP_TIMEOUT_SECS));
        let command = raw.command.map(|c| expand(&c)).filter(|c| !c.trim().is_empty());
        let url = raw.url.map(|u| expand(&u)).filter(|u| !u.trim().is_empty());

        let target = match (command, url) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingTransport { server: raw.name });
            }
            (None, None) => return Err(ConfigError::MissingTransport { server: raw.name }),
            (Some(command), None) if is_remote_url(&command) => ServerTarget::Url {
                url: command.trim().to_string(),
                headers: expand_values(raw.headers),
            },
            (Some(command), None) => ServerTarget::Command {
                command: PathBuf::from(command),
                args: raw.args.iter().map(|arg| expand(arg)).collect(),
                env: expand_values(raw.env),
                workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
            },
            (None, Some(url)) => ServerTarget::Url {
                url: url.trim().to_string(),
                headers: expand_values(raw.headers),
            },
        };

        Ok(Self {
            name: raw.name,
            target,
            timeout,
        })
    }
}

fn expand_values(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(key, value)| (key, expand(&value)))
        .collect()
}
