//! JSON-RPC bookkeeping shared by every MCP transport.
//!
//! A transport supplies a [`FrameSink`] for outbound messages and feeds each
//! inbound message to [`RpcPeer::dispatch`]. The peer matches responses to
//! pending requests, answers server-initiated requests and records
//! notifications the client cares about.

use super::error::McpError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, warn};

const METHOD_NOT_FOUND: i64 = -32601;

/// Awaited without a deadline; a tool call runs as long as the tool does.
const UNBOUNDED_METHODS: &[&str] = &["tools/call"];

#[async_trait]
pub(crate) trait FrameSink: Send + Sync {
    async fn send_frame(&self, frame: &Value) -> Result<(), McpError>;
}

type Responder = oneshot::Sender<Result<Value, McpError>>;

pub(crate) struct RpcPeer {
    server: String,
    timeout: Duration,
    sink: Box<dyn FrameSink>,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
    tools_changed: AtomicBool,
    disconnected: AtomicBool,
}

impl RpcPeer {
    pub(crate) fn new(server: &str, timeout: Duration, sink: Box<dyn FrameSink>) -> Self {
        Self {
            server: server.to_string(),
            timeout,
            sink,
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            tools_changed: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    pub(crate) fn server(&self) -> &str {
        &self.server
    }

    pub(crate) async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.sink.send_frame(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        let answer = if UNBOUNDED_METHODS.contains(&method) {
            rx.await
        } else {
            match tokio::time::timeout(self.timeout, rx).await {
                Ok(answer) => answer,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(McpError::Timeout {
                        server: self.server.clone(),
                        method: method.to_string(),
                        timeout_secs: self.timeout.as_secs(),
                    });
                }
            }
        };

        match answer {
            Ok(Ok(value)) => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(McpError::Cancelled {
                server: self.server.clone(),
            }),
        }
    }

    pub(crate) async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.sink.send_frame(&payload).await
    }

    /// Parses one raw inbound frame and dispatches it.
    pub(crate) async fn dispatch_text(&self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.starts_with('\u{1b}') {
            debug!(
                server = %self.server,
                line = trimmed,
                "skipping non-JSON ANSI log line from MCP server"
            );
            return;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => self.dispatch(value).await,
            Err(source) => warn!(
                server = %self.server,
                line = trimmed,
                %source,
                "received invalid JSON from MCP server"
            ),
        }
    }

    pub(crate) async fn dispatch(&self, value: Value) {
        let result = match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, &value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(&value);
                Ok(())
            }
            (None, false) => Ok(()),
        };
        if let Err(err) = result {
            warn!(
                server = %self.server,
                %err,
                "failed to process message from MCP server"
            );
        }
    }

    /// True once after the server announced a changed tool list.
    pub(crate) fn take_tools_changed(&self) -> bool {
        self.tools_changed.swap(false, Ordering::SeqCst)
    }

    /// Called by the transport's reader once the server side has gone away.
    pub(crate) async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.fail_all_pending().await;
    }

    pub(crate) fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    /// Wakes every in-flight request with a termination error.
    pub(crate) async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(McpError::Terminated {
                server: self.server.clone(),
            }));
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };
        let Some(sender) = self.pending.lock().await.remove(&key) else {
            debug!(
                server = %self.server,
                response_id = key,
                "received response for unknown request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(McpError::Rpc {
                server: self.server.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: &Value) -> Result<(), McpError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let reply = match method {
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            other => {
                warn!(
                    server = %self.server,
                    method = other,
                    "server sent unsupported request"
                );
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": METHOD_NOT_FOUND,
                        "message": format!("client does not implement method '{other}'"),
                    }
                })
            }
        };
        self.sink.send_frame(&reply).await
    }

    fn handle_notification(&self, value: &Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        debug!(server = %self.server, method, "received notification from server");
        if method == "notifications/tools/list_changed" {
            self.tools_changed.store(true, Ordering::SeqCst);
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
