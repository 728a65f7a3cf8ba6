//! Client side of the Model Context Protocol: stdio, SSE and websocket
//! transports over one JSON-RPC core, a lazily connected client, and the
//! blocking tool-group handle the registry works with.

mod client;
mod content;
mod error;
mod group;
mod rpc;
mod sse;
#[cfg(feature = "native-transport")]
mod stdio;
mod transport;
mod websocket;

pub use client::{ConnectionState, McpClient, RemoteTool};
pub use content::normalize_call_result;
pub use error::McpError;
pub use group::{McpTool, McpToolGroup};
pub use transport::{McpConnector, McpEndpoint, McpTransport, TransportKind};
