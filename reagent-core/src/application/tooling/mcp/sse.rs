use super::error::McpError;
use super::rpc::{FrameSink, RpcPeer};
use super::transport::McpTransport;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// MCP over Server-Sent Events: server-to-client messages arrive on the event
/// stream, client-to-server messages are POSTed to the URL announced by the
/// first `endpoint` event.
pub(crate) struct SseTransport {
    peer: Arc<RpcPeer>,
    reader: JoinHandle<()>,
}

struct PostSink {
    server: String,
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
}

#[async_trait]
impl FrameSink for PostSink {
    async fn send_frame(&self, frame: &Value) -> Result<(), McpError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(frame)
            .send()
            .await
            .map_err(|err| McpError::transport(&self.server, err.to_string()))?;
        if !response.status().is_success() {
            return Err(McpError::transport(
                &self.server,
                format!("POST {} returned {}", self.endpoint, response.status()),
            ));
        }
        Ok(())
    }
}

fn header_map(
    server: &str,
    headers: &HashMap<String, String>,
) -> Result<HeaderMap, McpError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| McpError::Connect {
            server: server.to_string(),
            message: format!("invalid header name '{key}': {err}"),
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| McpError::Connect {
            server: server.to_string(),
            message: format!("invalid value for header '{key}': {err}"),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

impl SseTransport {
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
        let base = Url::parse(url).map_err(|err| connect_error(format!("invalid URL: {err}")))?;
        let headers = header_map(name, headers)?;
        let client = reqwest::Client::new();

        let request = client
            .get(base.clone())
            .headers(headers.clone())
            .header(ACCEPT, "text/event-stream");
        let mut source = EventSource::new(request)
            .map_err(|err| connect_error(format!("cannot open event stream: {err}")))?;
        source.set_retry_policy(Box::new(Never));

        let announced = tokio::time::timeout(timeout, async {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Message(message)) if message.event == "endpoint" => {
                        return Ok(message.data);
                    }
                    Ok(_) => continue,
                    Err(err) => return Err(err.to_string()),
                }
            }
            Err("event stream ended before an endpoint was announced".to_string())
        })
        .await
        .map_err(|_| connect_error(format!("no endpoint event within {}s", timeout.as_secs())))?
        .map_err(connect_error)?;

        let endpoint = base
            .join(announced.trim())
            .map_err(|err| connect_error(format!("invalid endpoint '{announced}': {err}")))?;
        debug!(server = name, %endpoint, "MCP SSE endpoint announced");

        let sink = PostSink {
            server: name.to_string(),
            client,
            endpoint,
            headers,
        };
        let peer = Arc::new(RpcPeer::new(name, timeout, Box::new(sink)));
        let reader_peer = Arc::clone(&peer);
        let reader = tokio::spawn(async move {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Message(message)) if message.event == "message" => {
                        reader_peer.dispatch_text(&message.data).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(server = reader_peer.server(), %err, "MCP event stream failed");
                        break;
                    }
                }
            }
            source.close();
            reader_peer.disconnect().await;
        });

        Ok(Self { peer, reader })
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        self.peer.request(method, params).await
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.peer.notify(method, params).await
    }

    async fn close(&self) -> Result<(), McpError> {
        self.reader.abort();
        self.peer.fail_all_pending().await;
        Ok(())
    }

    fn take_tools_changed(&self) -> bool {
        self.peer.take_tools_changed()
    }

    fn is_connected(&self) -> bool {
        self.peer.is_connected()
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
