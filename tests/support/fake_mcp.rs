// In-process MCP server double shared by the registry and MCP tests.
//
// With `delay` unset no tokio timer is touched, so the fake also works under
// `InlineExecutor`.

#![allow(dead_code)]

use async_trait::async_trait;
use reagent_core::tooling::mcp::{McpConnector, McpError, McpTransport};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub lists: AtomicUsize,
    pub calls: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeServer {
    pub name: String,
    pub counters: Arc<Counters>,
    pub refuse: bool,
    pub delay: Option<Duration>,
}

impl FakeServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counters: Arc::new(Counters::default()),
            refuse: false,
            delay: None,
        }
    }

    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct FakeTransport {
    name: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl McpTransport for FakeTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        match method {
            "initialize" => Ok(json!({"protocolVersion": "2025-06-18", "capabilities": {}})),
            "tools/list" => {
                self.counters.lists.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"tools": [
                    {
                        "name": "echo",
                        "description": "Echo the text back",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"text": {"type": "string"}},
                            "required": ["text"]
                        }
                    },
                    {"name": "fail", "description": "Always reports an error", "inputSchema": {"type": "object"}},
                    {"name": "snapshot", "description": "Returns a picture", "inputSchema": {"type": "object"}},
                    {"name": "audio", "description": "Returns audio", "inputSchema": {"type": "object"}}
                ]}))
            }
            "tools/call" => {
                self.counters.calls.fetch_add(1, Ordering::SeqCst);
                let arguments = &params["arguments"];
                match params["name"].as_str().unwrap_or_default() {
                    "echo" => Ok(json!({"content": [
                        {"type": "text", "text": arguments["text"].as_str().unwrap_or_default()}
                    ]})),
                    "fail" => Ok(json!({
                        "isError": true,
                        "content": [{"type": "text", "text": "disk is full"}]
                    })),
                    "snapshot" => Ok(json!({"content": [
                        {"type": "text", "text": "captured"},
                        {"type": "image", "data": "iVBORw0KGgo=", "mimeType": "image/png"}
                    ]})),
                    "audio" => Ok(json!({"content": [
                        {"type": "audio", "data": "AAAA", "mimeType": "audio/wav"}
                    ]})),
                    other => Err(McpError::Rpc {
                        server: self.name.clone(),
                        code: -32602,
                        message: format!("unknown tool {other}"),
                    }),
                }
            }
            other => Err(McpError::Rpc {
                server: self.name.clone(),
                code: -32601,
                message: format!("method not found: {other}"),
            }),
        }
    }

    async fn notify(&self, _method: &str, _params: Value) -> Result<(), McpError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), McpError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl McpConnector for FakeServer {
    fn describe(&self) -> String {
        format!("fake-mcp --name {}", self.name)
    }

    async fn connect(&self) -> Result<Box<dyn McpTransport>, McpError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse {
            return Err(McpError::Connect {
                server: self.name.clone(),
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(FakeTransport {
            name: self.name.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}
