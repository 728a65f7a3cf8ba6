// Config loading tests - reading reagent.toml from disk and validating it

use reagent_core::agent::AgentOptions;
use reagent_core::config::{AppConfig, ConfigError, ServerTarget};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("reagent.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

const MODEL: &str = r#"
[model]
endpoint = "https://api.example.com"
model = "gpt-test"
api_key = "sk-test"
"#;

#[test]
fn returns_error_when_file_not_found() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/reagent.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn returns_error_on_invalid_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[model\nendpoint = ");

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn returns_error_when_model_missing() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[model]\nendpoint = \"http://localhost\"\n");

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::MissingModel)
    ));
}

#[test]
fn returns_error_when_endpoint_missing() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[model]\nmodel = \"m\"\n");

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::MissingEndpoint)
    ));
}

#[test]
fn rejects_duplicate_server_names() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        &format!(
            "{MODEL}{}",
            r#"
[[servers]]
name = "files"
command = "mcp-files"

[[servers]]
name = "files"
url = "http://localhost:8000/sse"
"#
        ),
    );

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::DuplicateServer { ref server }) if server == "files"
    ));
}

#[test]
fn rejects_server_without_transport() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), &format!("{MODEL}\n[[servers]]\nname = \"empty\"\n"));

    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(ConfigError::MissingTransport { .. })
    ));
}

#[test]
fn loads_full_configuration() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        &format!(
            "{MODEL}{}",
            r#"
[agent]
max_steps = 8
language = "Japanese"
require_confirmation = true
extra_instructions = "Prefer metric units."

[retry]
attempts = 4
timeout_secs = 45
wait_secs = 1

[[servers]]
name = "browser"
command = "npx"
args = ["-y", "@playwright/mcp"]
timeout_secs = 60

[[servers]]
name = "search"
url = "https://search.example.com/sse"
"#
        ),
    );

    let config = AppConfig::load(Some(&path)).expect("valid config");

    assert_eq!(config.model.model, "gpt-test");
    assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
    let policy = config.retry.policy();
    assert_eq!(policy.attempts, 4);
    assert_eq!(policy.timeout, Duration::from_secs(45));
    assert_eq!(policy.wait, Duration::from_secs(1));

    let options = AgentOptions::from_settings(&config.agent, &config.model.model);
    assert_eq!(options.max_steps, Some(8));
    assert_eq!(options.language, "Japanese");
    assert!(options.require_confirmation);
    assert!(options.is_exempt("final_answer"));
    assert!(options.is_exempt("user_input"));
    assert_eq!(options.extra_instructions.as_deref(), Some("Prefer metric units."));

    assert_eq!(config.servers.len(), 2);
    assert_eq!(config.servers[0].timeout, Duration::from_secs(60));
    assert!(matches!(
        &config.servers[0].target,
        ServerTarget::Command { command, args, .. }
            if command == Path::new("npx") && args.len() == 2
    ));
    assert_eq!(config.servers[1].describe(), "https://search.example.com/sse");
}

#[test]
#[serial]
fn api_key_falls_back_to_named_env_var() {
    unsafe {
        std::env::set_var("REAGENT_TEST_KEY", "from-env");
    }
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        "[model]\nendpoint = \"https://api.example.com\"\nmodel = \"m\"\napi_key_env = \"REAGENT_TEST_KEY\"\n",
    );

    let config = AppConfig::load(Some(&path)).expect("valid config");

    assert_eq!(config.model.api_key.as_deref(), Some("from-env"));
    unsafe {
        std::env::remove_var("REAGENT_TEST_KEY");
    }
}

#[test]
#[serial]
fn server_fields_expand_environment() {
    unsafe {
        std::env::set_var("REAGENT_TEST_TOOLS", "/opt/tools");
    }
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        &format!(
            "{MODEL}{}",
            r#"
[[servers]]
name = "local"
command = "${REAGENT_TEST_TOOLS}/mcp-server"
env = { DATA_DIR = "${REAGENT_TEST_TOOLS}/data" }
"#
        ),
    );

    let config = AppConfig::load(Some(&path)).expect("valid config");

    match &config.servers[0].target {
        ServerTarget::Command { command, env, .. } => {
            assert_eq!(command, Path::new("/opt/tools/mcp-server"));
            assert_eq!(env.get("DATA_DIR").map(String::as_str), Some("/opt/tools/data"));
        }
        other => panic!("expected command target, got {other:?}"),
    }
    unsafe {
        std::env::remove_var("REAGENT_TEST_TOOLS");
    }
}
