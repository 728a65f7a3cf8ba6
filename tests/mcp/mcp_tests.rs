// MCP tests - session establishment, the blocking bridge and stdio transport

#[path = "../support/fake_mcp.rs"]
mod fake_mcp;

use fake_mcp::FakeServer;
use reagent_core::config::McpServerConfig;
use reagent_core::executor::{RuntimeExecutor, TaskExecutor};
use reagent_core::tooling::mcp::{
    ConnectionState, McpClient, McpEndpoint, McpError, McpToolGroup, TransportKind,
};
use reagent_core::tooling::{RegistryError, ToolRegistry};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn runtime(name: &str) -> Arc<dyn TaskExecutor> {
    Arc::new(RuntimeExecutor::start(name).expect("executor starts"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_share_one_handshake() {
    let server = FakeServer::new("shared").slow(Duration::from_millis(50));
    let counters = Arc::clone(&server.counters);
    let client = Arc::new(McpClient::new("shared", server));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.initialize(false).await })
        })
        .collect();
    for task in tasks {
        let tools = task.await.expect("task joins").expect("initialises");
        assert_eq!(tools.len(), 4);
    }

    assert_eq!(counters.connects(), 1);
    assert_eq!(counters.lists(), 1);
    assert_eq!(client.state().await, ConnectionState::Connected);
}

#[test]
fn blocking_callers_from_many_threads_share_one_handshake() {
    let server = FakeServer::new("bridged").slow(Duration::from_millis(50));
    let counters = Arc::clone(&server.counters);
    let group = Arc::new(McpToolGroup::new(
        McpClient::new("bridged", server),
        runtime("mcp-test-bridge"),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                let mut args = serde_json::Map::new();
                args.insert("text".into(), json!(format!("call {i}")));
                group.call("echo", &args)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle.join().expect("thread").expect("remote call");
        assert_eq!(output.text, format!("call {i}"));
    }
    assert_eq!(counters.connects(), 1);
    assert_eq!(counters.calls(), 8);
}

#[test]
fn refresh_lists_again_without_reconnecting() {
    let server = FakeServer::new("refresh");
    let counters = Arc::clone(&server.counters);
    let group = McpToolGroup::new(McpClient::new("refresh", server), runtime("mcp-test-refresh"));

    group.tools().expect("first list");
    group.tools().expect("cached list");
    group.refresh().expect("forced list");

    assert_eq!(counters.connects(), 1);
    assert_eq!(counters.lists(), 2);
}

#[test]
fn closed_group_reconnects_on_next_use() {
    let server = FakeServer::new("again");
    let counters = Arc::clone(&server.counters);
    let group = McpToolGroup::new(McpClient::new("again", server), runtime("mcp-test-again"));

    group.tools().expect("connects");
    group.close().expect("closes");
    group.tools().expect("reconnects");

    assert_eq!(counters.connects(), 2);
    assert_eq!(counters.closes(), 1);
}

#[test]
fn duplicate_server_error_is_printable() {
    let registry = ToolRegistry::new();
    let first = registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("twin", FakeServer::new("twin")),
            runtime("mcp-test-twin"),
        ))
        .expect("first registers");

    let err = registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("twin", FakeServer::new("twin")),
            runtime("mcp-test-twin-2"),
        ))
        .unwrap_err();

    assert!(matches!(err, RegistryError::ServerConflict(ref name) if name == "twin"));
    assert!(format!("{first:?}").contains("twin"));
    registry.cleanup_all_clients();
}

#[test]
fn connection_strings_pick_transport() {
    assert_eq!(TransportKind::detect("http://localhost:8000/sse"), TransportKind::Sse);
    assert_eq!(TransportKind::detect("wss://tools.example.com/mcp"), TransportKind::WebSocket);
    assert_eq!(
        TransportKind::detect("npx -y @modelcontextprotocol/server-everything"),
        TransportKind::Stdio
    );

    let endpoint = McpEndpoint::parse("fs", "mcp-fs --root /srv", Duration::from_secs(5));
    assert_eq!(endpoint.kind(), TransportKind::Stdio);
    assert_eq!(endpoint.name(), "fs");

    let remote = McpEndpoint::from_config(&McpServerConfig::url("web", "ws://127.0.0.1:9/mcp"));
    assert_eq!(remote.kind(), TransportKind::WebSocket);
}

#[cfg(unix)]
#[test]
fn missing_server_binary_fails_registration() {
    let registry = ToolRegistry::new();
    let group = McpToolGroup::connect(
        "ghost",
        "/nonexistent/reagent-mcp-server --stdio",
        runtime("mcp-test-ghost"),
    );

    match registry.register_mcp_server(group) {
        Err(RegistryError::McpInit { server, source }) => {
            assert_eq!(server, "ghost");
            assert!(matches!(source, McpError::Spawn { .. }));
        }
        Err(other) => panic!("expected init failure, got {other:?}"),
        Ok(_) => panic!("a missing binary must not register"),
    }
    assert!(registry.tool_names().is_empty());
}

#[cfg(unix)]
#[test]
fn stdio_server_round_trip() {
    // Answers initialize, skips the initialized notification, lists one tool,
    // answers one call, then waits for stdin to close.
    const SCRIPT: &str = r#"
read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":"req-1","result":{"protocolVersion":"2025-06-18","capabilities":{}}}'
read -r _
read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":"req-2","result":{"tools":[{"name":"hello","description":"Say hi","inputSchema":{"type":"object"}}]}}'
read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":"req-3","result":{"content":[{"type":"text","text":"hi there"}]}}'
read -r _
"#;
    let config = McpServerConfig::command("scripted", "sh", vec!["-c".into(), SCRIPT.into()]);
    let registry = ToolRegistry::new();

    registry
        .register_mcp_server(McpToolGroup::from_config(&config, runtime("mcp-test-stdio")))
        .expect("handshake succeeds");
    let output = registry
        .call("scripted:hello", &serde_json::Map::new())
        .expect("tool answers");

    assert_eq!(output.text, "hi there");
    registry.cleanup_all_clients();
}

#[cfg(unix)]
#[test]
fn slow_tool_call_outlives_request_timeout() {
    // The handshake answers at once; the tool takes twice the timeout.
    const SCRIPT: &str = r#"
read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":"req-1","result":{"protocolVersion":"2025-06-18","capabilities":{}}}'
read -r _
read -r _
printf '%s\n' '{"jsonrpc":"2.0","id":"req-2","result":{"tools":[{"name":"build","description":"Long build","inputSchema":{"type":"object"}}]}}'
read -r _
sleep 2
printf '%s\n' '{"jsonrpc":"2.0","id":"req-3","result":{"content":[{"type":"text","text":"build finished"}]}}'
read -r _
"#;
    let mut config = McpServerConfig::command("builder", "sh", vec!["-c".into(), SCRIPT.into()]);
    config.timeout = Duration::from_secs(1);
    let registry = ToolRegistry::new();

    registry
        .register_mcp_server(McpToolGroup::from_config(&config, runtime("mcp-test-slow")))
        .expect("handshake succeeds");
    let output = registry
        .call("builder:build", &serde_json::Map::new())
        .expect("late answer is accepted");

    assert_eq!(output.text, "build finished");
    registry.cleanup_all_clients();
}
