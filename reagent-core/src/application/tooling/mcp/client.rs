use super::content::normalize_call_result;
use super::error::McpError;
use super::transport::{McpConnector, McpEndpoint, McpTransport};
use crate::application::tooling::function::ToolOutput;
use crate::config::McpServerConfig;
use crate::constants::MCP_PROTOCOL_VERSION;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

/// A tool as advertised by the server's `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl RemoteTool {
    fn from_listing(entry: &Value) -> Option<Self> {
        let name = entry.get("name").and_then(Value::as_str)?;
        Some(Self {
            name: name.to_string(),
            description: entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            input_schema: entry
                .get("inputSchema")
                .cloned()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    Closed,
}

struct Session {
    transport: Arc<dyn McpTransport>,
    tools: Vec<RemoteTool>,
}

enum SessionSlot {
    Unconnected,
    Connected(Session),
    Closed,
}

/// Lazily connected client for one MCP server.
///
/// The session is opened on the first [`McpClient::initialize`] or tool call
/// and shared by every later call. The slot lock is held across the whole
/// handshake, so concurrent first callers wait for the one in flight instead
/// of opening their own.
pub struct McpClient {
    name: String,
    connector: Box<dyn McpConnector>,
    slot: AsyncMutex<SessionSlot>,
}

impl McpClient {
    pub fn new(name: impl Into<String>, connector: impl McpConnector + 'static) -> Self {
        Self {
            name: name.into(),
            connector: Box::new(connector),
            slot: AsyncMutex::new(SessionSlot::Unconnected),
        }
    }

    pub fn from_config(config: &McpServerConfig) -> Self {
        Self::new(config.name.clone(), McpEndpoint::from_config(config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    pub async fn state(&self) -> ConnectionState {
        match &*self.slot.lock().await {
            SessionSlot::Unconnected => ConnectionState::Unconnected,
            SessionSlot::Connected(session) if !session.transport.is_connected() => {
                ConnectionState::Unconnected
            }
            SessionSlot::Connected(_) => ConnectionState::Connected,
            SessionSlot::Closed => ConnectionState::Closed,
        }
    }

    /// Connects if needed and returns the cached tool list.
    ///
    /// With `force_refresh`, or after the server announced a changed list,
    /// the list is fetched again over the existing session.
    pub async fn initialize(&self, force_refresh: bool) -> Result<Vec<RemoteTool>, McpError> {
        let mut slot = self.slot.lock().await;

        let lost = matches!(
            &*slot,
            SessionSlot::Connected(session) if !session.transport.is_connected()
        );
        if lost {
            warn!(server = %self.name, "MCP server connection lost; reconnecting");
            if let SessionSlot::Connected(session) =
                std::mem::replace(&mut *slot, SessionSlot::Unconnected)
            {
                let _ = session.transport.close().await;
            }
        }

        if let SessionSlot::Connected(session) = &mut *slot {
            if force_refresh || session.transport.take_tools_changed() {
                debug!(server = %self.name, "refreshing MCP tool list");
                session.tools = list_tools(session.transport.as_ref()).await?;
            }
            return Ok(session.tools.clone());
        }

        match self.open_session().await {
            Ok(session) => {
                info!(
                    server = %self.name,
                    tools = session.tools.len(),
                    "connected to MCP server"
                );
                let tools = session.tools.clone();
                *slot = SessionSlot::Connected(session);
                Ok(tools)
            }
            Err(err) => {
                error!(
                    server = %self.name,
                    target = %self.connector.describe(),
                    %err,
                    "failed to initialise MCP server"
                );
                Err(err)
            }
        }
    }

    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<ToolOutput, McpError> {
        let transport = self.transport().await?;
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        debug!(server = %self.name, tool, "calling MCP tool");
        let result = transport.request("tools/call", params).await?;
        normalize_call_result(&self.name, &result)
    }

    /// Tears the session down. A later call reconnects.
    pub async fn close(&self) -> Result<(), McpError> {
        let previous = std::mem::replace(&mut *self.slot.lock().await, SessionSlot::Closed);
        match previous {
            SessionSlot::Connected(session) => {
                debug!(server = %self.name, "closing MCP session");
                session.transport.close().await
            }
            SessionSlot::Unconnected | SessionSlot::Closed => Ok(()),
        }
    }

    async fn transport(&self) -> Result<Arc<dyn McpTransport>, McpError> {
        self.initialize(false).await?;
        match &*self.slot.lock().await {
            SessionSlot::Connected(session) => Ok(Arc::clone(&session.transport)),
            _ => Err(McpError::Closed {
                server: self.name.clone(),
            }),
        }
    }

    async fn open_session(&self) -> Result<Session, McpError> {
        debug!(server = %self.name, target = %self.connector.describe(), "connecting to MCP server");
        let transport: Arc<dyn McpTransport> = Arc::from(self.connector.connect().await?);

        match handshake(transport.as_ref()).await {
            Ok(tools) => Ok(Session { transport, tools }),
            Err(err) => {
                let _ = transport.close().await;
                Err(err)
            }
        }
    }
}

async fn handshake(transport: &dyn McpTransport) -> Result<Vec<RemoteTool>, McpError> {
    let params = json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {}
    });
    transport.request("initialize", params).await?;
    transport
        .notify("notifications/initialized", json!({}))
        .await?;
    list_tools(transport).await
}

async fn list_tools(transport: &dyn McpTransport) -> Result<Vec<RemoteTool>, McpError> {
    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let params = match &cursor {
            Some(cursor) => json!({ "cursor": cursor }),
            None => json!({}),
        };
        let page = transport.request("tools/list", params).await?;
        if let Some(entries) = page.get("tools").and_then(Value::as_array) {
            tools.extend(entries.iter().filter_map(RemoteTool::from_listing));
        }
        cursor = page
            .get("nextCursor")
            .and_then(Value::as_str)
            .map(str::to_string);
        if cursor.is_none() {
            return Ok(tools);
        }
    }
}
