use super::mcp::McpError;
use thiserror::Error;

/// Failure while resolving or running a tool call.
///
/// These never abort a run: the step controller renders them into the
/// action's observation as `Error: <message>`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Can't find tool {0}")]
    NotFound(String),
    #[error("missing required argument '{argument}' for tool '{tool}'")]
    MissingArgument { tool: String, argument: String },
    #[error("{0}")]
    Execution(String),
    #[error(transparent)]
    Mcp(#[from] McpError),
}

impl ToolError {
    pub fn execution(message: impl std::fmt::Display) -> Self {
        ToolError::Execution(message.to_string())
    }
}

/// Registration-time failure. Always fatal for the registration call.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    ToolConflict(String),
    #[error("MCP tool '{0}' is already registered")]
    McpToolConflict(String),
    #[error("MCP server '{0}' is already registered")]
    ServerConflict(String),
    #[error("failed to load tools from MCP server '{server}': {source}")]
    McpInit {
        server: String,
        #[source]
        source: McpError,
    },
}

impl RegistryError {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RegistryError::ToolConflict(_)
                | RegistryError::McpToolConflict(_)
                | RegistryError::ServerConflict(_)
        )
    }
}
