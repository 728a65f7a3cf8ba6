use super::error::McpError;
use crate::config::{McpServerConfig, ServerTarget};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

static SSE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)https?://").expect("literal regex"));
static WS_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)wss?://").expect("literal regex"));

/// A live, bidirectional JSON-RPC session with one MCP server.
#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError>;

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError>;

    async fn close(&self) -> Result<(), McpError>;

    /// Returns true once after the server announced a changed tool list.
    fn take_tools_changed(&self) -> bool {
        false
    }

    /// False once the server end has gone away; the client then reconnects.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Opens transports to one endpoint. Each `connect` is one handshake's worth
/// of process spawn or network connection.
#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Command line or URL, for log lines.
    fn describe(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn McpTransport>, McpError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Sse,
    WebSocket,
}

impl TransportKind {
    /// `http(s)://` selects SSE, `ws(s)://` selects websocket, anything else is
    /// a command to spawn.
    pub fn detect(connection: &str) -> Self {
        let connection = connection.trim();
        if SSE_URL.is_match(connection) {
            TransportKind::Sse
        } else if WS_URL.is_match(connection) {
            TransportKind::WebSocket
        } else {
            TransportKind::Stdio
        }
    }
}

/// Connection parameters for one server, with the transport already chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpEndpoint {
    Stdio {
        name: String,
        command: PathBuf,
        args: Vec<String>,
        env: HashMap<String, String>,
        workdir: Option<PathBuf>,
        timeout: Duration,
    },
    Sse {
        name: String,
        url: String,
        headers: HashMap<String, String>,
        timeout: Duration,
    },
    WebSocket {
        name: String,
        url: String,
        headers: HashMap<String, String>,
        timeout: Duration,
    },
}

impl McpEndpoint {
    /// Builds an endpoint from a bare connection string: a URL, or a command
    /// line split on whitespace.
    pub fn parse(name: &str, connection: &str, timeout: Duration) -> Self {
        let connection = connection.trim();
        match TransportKind::detect(connection) {
            TransportKind::Sse => McpEndpoint::Sse {
                name: name.to_string(),
                url: connection.to_string(),
                headers: HashMap::new(),
                timeout,
            },
            TransportKind::WebSocket => McpEndpoint::WebSocket {
                name: name.to_string(),
                url: connection.to_string(),
                headers: HashMap::new(),
                timeout,
            },
            TransportKind::Stdio => {
                let mut parts = connection.split_whitespace().map(str::to_string);
                let command = parts.next().unwrap_or_default();
                McpEndpoint::Stdio {
                    name: name.to_string(),
                    command: PathBuf::from(command),
                    args: parts.collect(),
                    env: HashMap::new(),
                    workdir: None,
                    timeout,
                }
            }
        }
    }

    pub fn from_config(config: &McpServerConfig) -> Self {
        match &config.target {
            ServerTarget::Command {
                command,
                args,
                env,
                workdir,
            } => McpEndpoint::Stdio {
                name: config.name.clone(),
                command: command.clone(),
                args: args.clone(),
                env: env.clone(),
                workdir: workdir.clone(),
                timeout: config.timeout,
            },
            ServerTarget::Url { url, headers } => match TransportKind::detect(url) {
                TransportKind::WebSocket => McpEndpoint::WebSocket {
                    name: config.name.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                    timeout: config.timeout,
                },
                _ => McpEndpoint::Sse {
                    name: config.name.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                    timeout: config.timeout,
                },
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            McpEndpoint::Stdio { name, .. }
            | McpEndpoint::Sse { name, .. }
            | McpEndpoint::WebSocket { name, .. } => name,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            McpEndpoint::Stdio { .. } => TransportKind::Stdio,
            McpEndpoint::Sse { .. } => TransportKind::Sse,
            McpEndpoint::WebSocket { .. } => TransportKind::WebSocket,
        }
    }
}

#[async_trait]
impl McpConnector for McpEndpoint {
    fn describe(&self) -> String {
        match self {
            McpEndpoint::Stdio { command, args, .. } => {
                let mut line = command.display().to_string();
                for arg in args {
                    line.push(' ');
                    line.push_str(arg);
                }
                line
            }
            McpEndpoint::Sse { url, .. } | McpEndpoint::WebSocket { url, .. } => url.clone(),
        }
    }

    async fn connect(&self) -> Result<Box<dyn McpTransport>, McpError> {
        match self {
            #[cfg(feature = "native-transport")]
            McpEndpoint::Stdio {
                name,
                command,
                args,
                env,
                workdir,
                timeout,
            } => {
                let transport = super::stdio::StdioTransport::spawn(
                    name,
                    command,
                    args,
                    env,
                    workdir.as_deref(),
                    *timeout,
                )?;
                Ok(Box::new(transport))
            }
            #[cfg(not(feature = "native-transport"))]
            McpEndpoint::Stdio { name, .. } => Err(McpError::Connect {
                server: name.clone(),
                message: "stdio transport requires the native-transport feature".to_string(),
            }),
            McpEndpoint::Sse {
                name,
                url,
                headers,
                timeout,
            } => {
                let transport =
                    super::sse::SseTransport::connect(name, url, headers, *timeout).await?;
                Ok(Box::new(transport))
            }
            McpEndpoint::WebSocket {
                name,
                url,
                headers,
                timeout,
            } => {
                let transport =
                    super::websocket::WebSocketTransport::connect(name, url, headers, *timeout)
                        .await?;
                Ok(Box::new(transport))
            }
        }
    }
}
