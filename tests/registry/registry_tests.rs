// Tool registry tests - registration, lookup and MCP tool groups
//
// MCP servers are served by the in-process fake and bridged through
// `InlineExecutor`, so no runtime thread or subprocess is involved.

#[path = "../support/fake_mcp.rs"]
mod fake_mcp;

use fake_mcp::FakeServer;
use reagent_core::domain::{Action, Observation, ToolArgs};
use reagent_core::executor::{InlineExecutor, TaskExecutor};
use reagent_core::tooling::mcp::{McpClient, McpToolGroup};
use reagent_core::tooling::{
    Param, ParamType, RegistryError, ToolError, ToolRegistry, ToolSet, arg_str,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn args(value: Value) -> ToolArgs {
    value.as_object().cloned().unwrap_or_default()
}

fn inline() -> Arc<dyn TaskExecutor> {
    Arc::new(InlineExecutor)
}

fn greet_registry(tag: &'static str) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register_function(
            "greet",
            "Greet someone.\n\nArgs:\n    name (str): Who to greet.",
            &[Param::required("name", ParamType::String)],
            move |a: &ToolArgs| Ok::<_, String>(format!("{tag} {}", arg_str(a, "name").unwrap_or_default())),
        )
        .expect("first registration");
    registry
}

#[test]
fn duplicate_name_is_rejected_and_first_handler_kept() {
    let registry = greet_registry("hello");

    let err = registry
        .register_function("greet", "Greet rudely.", &[], |_: &ToolArgs| {
            Ok::<_, String>("go away".to_string())
        })
        .unwrap_err();

    assert!(matches!(err, RegistryError::ToolConflict(ref name) if name == "greet"));
    assert!(err.is_conflict());
    let output = registry
        .call("greet", &args(json!({"name": "Ada"})))
        .expect("original handler answers");
    assert_eq!(output.text, "hello Ada");
}

#[test]
fn unknown_tool_reports_its_name() {
    let registry = ToolRegistry::new();

    let err = registry.call("missing", &ToolArgs::new()).unwrap_err();

    assert!(matches!(err, ToolError::NotFound(_)));
    assert_eq!(Observation::error(&err).text, "Error: Can't find tool missing");
}

#[test]
fn missing_required_argument_is_a_tool_error() {
    let registry = greet_registry("hi");

    let err = registry.call("greet", &ToolArgs::new()).unwrap_err();

    assert!(matches!(err, ToolError::MissingArgument { .. }));
}

#[test]
fn handler_failure_becomes_error_observation() {
    let registry = ToolRegistry::new();
    registry
        .register_function("explode", "Always fails.", &[], |_: &ToolArgs| {
            Err::<String, _>("boom")
        })
        .expect("registers");

    let err = registry.call("explode", &ToolArgs::new()).unwrap_err();

    assert_eq!(Observation::error(err).text, "Error: boom");
}

#[test]
fn observation_resolution_calls_tool_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = ToolRegistry::new();
    registry
        .register_function("tick", "Count calls.", &[], move |_: &ToolArgs| {
            Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst).to_string())
        })
        .expect("registers");

    let action = Action::new("count", "tick", ToolArgs::new());
    let resolve = |a: &Action| match registry.call(&a.tool, &a.args) {
        Ok(output) => Observation::text(output.text),
        Err(err) => Observation::error(err),
    };
    let first = action.resolve_with(resolve).text.clone();
    let second = action.resolve_with(resolve).text.clone();

    assert_eq!(first, "0");
    assert_eq!(second, "0");
    assert_eq!(action.obs(), Some("0"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn group_members_are_namespaced() {
    let registry = ToolRegistry::new();
    let calculator = ToolSet::new("Calculator")
        .method(
            "add",
            "Add two numbers.\n\nArgs:\n    a (int): Left.\n    b (int): Right.",
            &[
                Param::required("a", ParamType::Integer),
                Param::required("b", ParamType::Integer),
            ],
            |a: &ToolArgs| {
                let left = reagent_core::tooling::arg_i64(a, "a").unwrap_or_default();
                let right = reagent_core::tooling::arg_i64(a, "b").unwrap_or_default();
                Ok::<_, String>((left + right).to_string())
            },
        )
        .method("zero", "Return zero.", &[], |_: &ToolArgs| Ok::<_, String>("0"));

    let descriptors = registry.register_group(&calculator).expect("registers");

    assert_eq!(descriptors.len(), 2);
    assert!(registry.contains("Calculator:add"));
    assert!(!registry.contains("add"));
    let output = registry
        .call("Calculator:add", &args(json!({"a": "2", "b": 40})))
        .expect("runs");
    assert_eq!(output.text, "42");
}

#[test]
fn conflicting_group_registers_nothing() {
    let registry = ToolRegistry::new();
    registry
        .register_function("Tools:b", "Taken.", &[], |_: &ToolArgs| Ok::<_, String>("x"))
        .expect("registers");
    let group = ToolSet::new("Tools")
        .method("a", "A.", &[], |_: &ToolArgs| Ok::<_, String>("a"))
        .method("b", "B.", &[], |_: &ToolArgs| Ok::<_, String>("b"));

    assert!(registry.register_group(&group).is_err());
    assert!(!registry.contains("Tools:a"));
}

#[test]
fn mcp_server_tools_are_registered_and_callable() {
    let server = FakeServer::new("files");
    let counters = Arc::clone(&server.counters);
    let registry = ToolRegistry::new();

    let group = registry
        .register_mcp_server(McpToolGroup::new(McpClient::new("files", server), inline()))
        .expect("registers");

    assert_eq!(group.name(), "files");
    assert!(registry.contains("files:echo"));
    assert_eq!(counters.connects(), 1);

    let output = registry
        .call("files:echo", &args(json!({"text": "ping"})))
        .expect("remote call");
    assert_eq!(output.text, "ping");
    assert_eq!(counters.connects(), 1);
}

#[test]
fn mcp_tool_error_and_image_map_to_observations() {
    let registry = ToolRegistry::new();
    registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("shots", FakeServer::new("shots")),
            inline(),
        ))
        .expect("registers");

    let failed = registry.call("shots:fail", &ToolArgs::new()).unwrap_err();
    assert_eq!(Observation::error(failed).text, "Error: disk is full");

    let picture = registry.call("shots:snapshot", &ToolArgs::new()).expect("runs");
    assert_eq!(picture.text, "captured");
    assert_eq!(picture.image.as_deref(), Some("iVBORw0KGgo="));

    let audio = registry.call("shots:audio", &ToolArgs::new()).unwrap_err();
    assert!(Observation::error(audio).text.contains("unsupported content type 'audio'"));
}

#[test]
fn mcp_server_names_are_unique() {
    let registry = ToolRegistry::new();
    registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("dup", FakeServer::new("dup")),
            inline(),
        ))
        .expect("first registers");

    let err = registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("dup", FakeServer::new("dup")),
            inline(),
        ))
        .unwrap_err();

    assert!(matches!(err, RegistryError::ServerConflict(ref name) if name == "dup"));
}

#[test]
fn failed_mcp_server_is_not_registered() {
    let registry = ToolRegistry::new();

    let err = registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("down", FakeServer::new("down").refusing()),
            inline(),
        ))
        .unwrap_err();

    assert!(matches!(err, RegistryError::McpInit { ref server, .. } if server == "down"));
    assert!(registry.tool_names().is_empty());

    // The name is free again once the failure is reported.
    registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("down", FakeServer::new("down")),
            inline(),
        ))
        .expect("retry registers");
}

#[test]
fn cleanup_closes_each_connection_once() {
    let server = FakeServer::new("files");
    let counters = Arc::clone(&server.counters);
    let registry = ToolRegistry::new();
    registry
        .register_mcp_server(McpToolGroup::new(McpClient::new("files", server), inline()))
        .expect("registers");

    registry.cleanup_all_clients();

    assert_eq!(counters.closes(), 1);
}

#[test]
fn descriptors_list_plain_tools_before_mcp_tools() {
    let registry = greet_registry("hi");
    registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("files", FakeServer::new("files")),
            inline(),
        ))
        .expect("registers");

    let names = registry.tool_names();

    assert_eq!(names.first().map(String::as_str), Some("greet"));
    assert!(names.contains(&"files:echo".to_string()));
    let echo = registry
        .descriptors()
        .into_iter()
        .find(|d| d.name == "files:echo")
        .expect("listed");
    assert_eq!(echo.required_args(), vec!["text".to_string()]);
}
