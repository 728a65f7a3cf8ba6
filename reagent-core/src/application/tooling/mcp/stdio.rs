use super::error::McpError;
use super::rpc::{FrameSink, RpcPeer};
use super::transport::McpTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Newline-delimited JSON-RPC over a child process's stdin/stdout.
pub(crate) struct StdioTransport {
    peer: Arc<RpcPeer>,
    child: AsyncMutex<Option<Child>>,
    reader: JoinHandle<()>,
}

struct StdinSink {
    server: String,
    writer: AsyncMutex<BufWriter<ChildStdin>>,
}

#[async_trait]
impl FrameSink for StdinSink {
    async fn send_frame(&self, frame: &Value) -> Result<(), McpError> {
        let encoded = serde_json::to_string(frame).map_err(|source| McpError::InvalidJson {
            server: self.server.clone(),
            source,
        })?;
        let io_error = |source: std::io::Error| McpError::transport(&self.server, source.to_string());

        let mut writer = self.writer.lock().await;
        writer.write_all(encoded.as_bytes()).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;
        Ok(())
    }
}

impl StdioTransport {
    pub(crate) fn spawn(
        name: &str,
        program: &PathBuf,
        args: &[String],
        env: &HashMap<String, String>,
        workdir: Option<&Path>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }
        command.args(args);
        for (key, value) in env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| McpError::Spawn {
            server: name.to_string(),
            source,
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::transport(name, "failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::transport(name, "failed to capture server stdout"))?;

        let sink = StdinSink {
            server: name.to_string(),
            writer: AsyncMutex::new(BufWriter::new(stdin)),
        };
        let peer = Arc::new(RpcPeer::new(name, timeout, Box::new(sink)));
        let reader = tokio::spawn(reader_loop(Arc::clone(&peer), stdout));
        debug!(server = name, pid = ?child.id(), "spawned MCP server process");

        Ok(Self {
            peer,
            child: AsyncMutex::new(Some(child)),
            reader,
        })
    }
}

async fn reader_loop(peer: Arc<RpcPeer>, stdout: ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(raw)) = lines.next_line().await {
        peer.dispatch_text(&raw).await;
    }
    debug!(server = peer.server(), "MCP server stdout closed");
    peer.disconnect().await;
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        self.peer.request(method, params).await
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.peer.notify(method, params).await
    }

    async fn close(&self) -> Result<(), McpError> {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(
                    server = self.peer.server(),
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
            let _ = child.wait().await;
        }
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

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
