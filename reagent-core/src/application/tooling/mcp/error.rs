use crate::application::executor::ExecutorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to MCP server '{server}': {message}")]
    Connect { server: String, message: String },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
    #[error("MCP server '{server}' did not answer '{method}' within {timeout_secs}s")]
    Timeout {
        server: String,
        method: String,
        timeout_secs: u64,
    },
    #[error("MCP server '{server}' returned unsupported content type '{kind}'")]
    UnsupportedContent { server: String, kind: String },
    #[error("{message}")]
    ToolReported { server: String, message: String },
    #[error("MCP client '{server}' is closed")]
    Closed { server: String },
    #[error("MCP server '{server}' could not be reached from the calling thread: {source}")]
    Bridge {
        server: String,
        #[source]
        source: ExecutorError,
    },
}

impl McpError {
    pub fn server(&self) -> &str {
        match self {
            McpError::Spawn { server, .. }
            | McpError::Connect { server, .. }
            | McpError::Transport { server, .. }
            | McpError::InvalidJson { server, .. }
            | McpError::Rpc { server, .. }
            | McpError::Terminated { server }
            | McpError::Cancelled { server }
            | McpError::Timeout { server, .. }
            | McpError::UnsupportedContent { server, .. }
            | McpError::ToolReported { server, .. }
            | McpError::Closed { server }
            | McpError::Bridge { server, .. } => server,
        }
    }

    pub(crate) fn transport(server: &str, message: impl Into<String>) -> Self {
        McpError::Transport {
            server: server.to_string(),
            message: message.into(),
        }
    }
}
