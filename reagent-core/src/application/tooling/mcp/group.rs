use super::client::{McpClient, RemoteTool};
use super::error::McpError;
use super::transport::McpEndpoint;
use crate::application::executor::TaskExecutor;
use crate::application::tooling::error::ToolError;
use crate::application::tooling::function::{Tool, ToolOutput};
use crate::application::tooling::group::qualified_name;
use crate::application::tooling::schema::ToolDescriptor;
use crate::config::McpServerConfig;
use crate::config::defaults::DEFAULT_MCP_TIMEOUT_SECS;
use crate::domain::ToolArgs;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Blocking handle on one MCP server.
///
/// Every method submits the async client call to the executor and parks the
/// calling thread until it finishes. Nothing connects until [`Self::tools`]
/// or a tool call is made.
pub struct McpToolGroup {
    client: Arc<McpClient>,
    executor: Arc<dyn TaskExecutor>,
}

impl fmt::Debug for McpToolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpToolGroup")
            .field("server", &self.client.name())
            .field("target", &self.client.describe())
            .finish()
    }
}

impl McpToolGroup {
    pub fn new(client: McpClient, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            client: Arc::new(client),
            executor,
        }
    }

    pub fn from_config(config: &McpServerConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self::new(McpClient::from_config(config), executor)
    }

    /// `connection` is a URL or a command line.
    pub fn connect(name: &str, connection: &str, executor: Arc<dyn TaskExecutor>) -> Self {
        let endpoint = McpEndpoint::parse(
            name,
            connection,
            Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS),
        );
        Self::new(McpClient::new(name, endpoint), executor)
    }

    pub fn name(&self) -> &str {
        self.client.name()
    }

    pub fn client(&self) -> &Arc<McpClient> {
        &self.client
    }

    /// Initialises the session on first use and returns the remote tool list.
    pub fn tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        let client = Arc::clone(&self.client);
        self.bridge(async move { client.initialize(false).await })
    }

    pub fn refresh(&self) -> Result<Vec<RemoteTool>, McpError> {
        let client = Arc::clone(&self.client);
        self.bridge(async move { client.initialize(true).await })
    }

    pub fn call(&self, tool: &str, args: &ToolArgs) -> Result<ToolOutput, McpError> {
        let client = Arc::clone(&self.client);
        let tool = tool.to_string();
        let arguments = Value::Object(args.clone());
        self.bridge(async move { client.call_tool(&tool, arguments).await })
    }

    pub fn close(&self) -> Result<(), McpError> {
        let client = Arc::clone(&self.client);
        self.bridge(async move { client.close().await })
    }

    fn bridge<F, T>(&self, future: F) -> Result<T, McpError>
    where
        F: Future<Output = Result<T, McpError>> + Send + 'static,
        T: Send + 'static,
    {
        self.executor
            .block_on(future)
            .map_err(|source| McpError::Bridge {
                server: self.name().to_string(),
                source,
            })?
    }
}

/// One remote tool exposed through the registry as `"<server>:<tool>"`.
pub struct McpTool {
    descriptor: ToolDescriptor,
    remote_name: String,
    group: Arc<McpToolGroup>,
}

impl McpTool {
    pub fn new(group: Arc<McpToolGroup>, remote: &RemoteTool) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                qualified_name(group.name(), &remote.name),
                remote.description.clone(),
                remote.input_schema.clone(),
            ),
            remote_name: remote.name.clone(),
            group,
        }
    }

    pub fn group(&self) -> &Arc<McpToolGroup> {
        &self.group
    }
}

impl Tool for McpTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn call(&self, args: &ToolArgs) -> Result<ToolOutput, ToolError> {
        Ok(self.group.call(&self.remote_name, args)?)
    }
}
