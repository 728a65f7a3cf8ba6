mod cli;

use clap::Parser;
use cli::Cli;
use reagent_core::agent::{
    AgentOptions, AgentOutcome, AutoApprove, ConsoleApproval, LoopState, ReactAgent, ToolApproval,
};
use reagent_core::executor::{RuntimeExecutor, TaskExecutor};
use reagent_core::model::OpenAiChatModel;
use reagent_core::tooling::mcp::McpToolGroup;
use reagent_core::tooling::{ToolRegistry, user_input_tool};
use reagent_core::AppConfig;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);
    debug!(
        config = ?cli.config,
        prompt_file = ?cli.prompt_file,
        max_steps = ?cli.max_steps,
        "CLI arguments parsed"
    );

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("Loaded configuration from default path"),
    }
    let prompt = load_prompt(&cli)?;

    let executor: Arc<dyn TaskExecutor> = RuntimeExecutor::shared()?;
    let registry = Arc::new(ToolRegistry::new());
    registry.register_tool(Arc::new(user_input_tool()))?;
    if let Err(err) = register_servers(&registry, &config, &executor) {
        registry.cleanup_all_clients();
        return Err(err);
    }

    let mut options = AgentOptions::from_settings(&config.agent, &config.model.model);
    apply_cli_overrides(&cli, &mut options);
    let approval: Arc<dyn ToolApproval> = if options.require_confirmation {
        Arc::new(ConsoleApproval)
    } else {
        Arc::new(AutoApprove)
    };

    let model = Arc::new(OpenAiChatModel::from_config(&config.model, executor));
    let agent = ReactAgent::new(model, registry.clone(), options)
        .with_approval(approval)
        .with_retry(config.retry.policy());

    info!(tools = registry.tool_names().len(), "Running task");
    let result = agent.run(|task: &str| task.to_string(), prompt.as_str());
    registry.cleanup_all_clients();

    let outcome = result.map_err(|err| err.user_message())?;
    print_outcome(&outcome, cli.json)?;
    Ok(())
}

fn register_servers(
    registry: &ToolRegistry,
    config: &AppConfig,
    executor: &Arc<dyn TaskExecutor>,
) -> Result<(), Box<dyn Error>> {
    for server in &config.servers {
        let group = McpToolGroup::from_config(server, executor.clone());
        let group = registry.register_mcp_server(group)?;
        info!(server = group.name(), "Registered MCP server");
    }
    Ok(())
}

fn apply_cli_overrides(cli: &Cli, options: &mut AgentOptions) {
    if let Some(max_steps) = cli.max_steps {
        options.max_steps = Some(max_steps);
    }
    if let Some(language) = &cli.language {
        options.language = language.clone();
    }
    if cli.confirm {
        options.require_confirmation = true;
    }
}

fn print_outcome(outcome: &AgentOutcome, as_json: bool) -> Result<(), Box<dyn Error>> {
    if outcome.state == LoopState::Exhausted {
        warn!(steps = outcome.steps, "Step budget exhausted; answer is best effort");
    }

    if as_json {
        let output = json!({
            "content": outcome.output.to_string(),
            "steps": outcome.steps,
            "exhausted": outcome.state == LoopState::Exhausted,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", outcome.output);
    }
    Ok(())
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(io::stderr)
            .init();
    });
}

fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path.display(), "Loading prompt from file");
        let content = fs::read_to_string(path)?;
        return non_empty(content);
    }

    if !cli.prompt.is_empty() {
        info!("Using prompt provided through CLI arguments");
        return non_empty(cli.prompt.join(" "));
    }

    if !io::stdin().is_terminal() {
        info!("Reading prompt from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return non_empty(buffer);
    }

    warn!("Prompt not provided via arguments, file, or stdin");
    Err("prompt required via arguments, file, or stdin".into())
}

fn non_empty(prompt: String) -> Result<String, Box<dyn Error>> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err("prompt is empty".into());
    }
    Ok(trimmed.to_string())
}
