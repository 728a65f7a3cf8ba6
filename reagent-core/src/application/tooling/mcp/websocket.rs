use super::error::McpError;
use super::rpc::{FrameSink, RpcPeer};
use super::transport::McpTransport;
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// MCP over a websocket carrying one JSON-RPC message per text frame.
pub(crate) struct WebSocketTransport {
    peer: Arc<RpcPeer>,
    writer: Arc<AsyncMutex<WsWriter>>,
    reader: JoinHandle<()>,
}

struct WsSink {
    server: String,
    writer: Arc<AsyncMutex<WsWriter>>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&self, frame: &Value) -> Result<(), McpError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(WsMessage::Text(frame.to_string().into()))
            .await
            .map_err(|err| McpError::transport(&self.server, err.to_string()))
    }
}

impl WebSocketTransport {
    pub(crate) async fn connect(
        name: &str,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let connect_error = |message: String| McpError::Connect {
            server: name.to_string(),
            message,
        };

        let mut request = url
            .into_client_request()
            .map_err(|err| connect_error(format!("invalid URL: {err}")))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("mcp"));
        for (key, value) in headers {
            let header = HeaderName::from_bytes(key.as_bytes())
                .map_err(|err| connect_error(format!("invalid header name '{key}': {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| connect_error(format!("invalid value for header '{key}': {err}")))?;
            request.headers_mut().insert(header, value);
        }

        let (stream, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| connect_error(format!("no handshake within {}s", timeout.as_secs())))?
            .map_err(|err| connect_error(err.to_string()))?;
        debug!(server = name, url, "MCP websocket connected");

        let (write, mut read) = stream.split();
        let writer = Arc::new(AsyncMutex::new(write));
        let sink = WsSink {
            server: name.to_string(),
            writer: Arc::clone(&writer),
        };
        let peer = Arc::new(RpcPeer::new(name, timeout, Box::new(sink)));
        let reader_peer = Arc::clone(&peer);
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => reader_peer.dispatch_text(text.as_str()).await,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(server = reader_peer.server(), %err, "MCP websocket failed");
                        break;
                    }
                }
            }
            reader_peer.disconnect().await;
        });

        Ok(Self {
            peer,
            writer,
            reader,
        })
    }
}

#[async_trait]
impl McpTransport for WebSocketTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        self.peer.request(method, params).await
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.peer.notify(method, params).await
    }

    async fn close(&self) -> Result<(), McpError> {
        let closed = self.writer.lock().await.send(WsMessage::Close(None)).await;
        self.reader.abort();
        self.peer.fail_all_pending().await;
        closed.map_err(|err| McpError::transport(self.peer.server(), err.to_string()))
    }

    fn take_tools_changed(&self) -> bool {
        self.peer.take_tools_changed()
    }

    fn is_connected(&self) -> bool {
        self.peer.is_connected()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
