use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "reagent",
    version,
    about = "Run a task through a ReAct agent with local and MCP tools"
)]
pub struct Cli {
    /// Configuration file (defaults to config/reagent.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Read the task from a file instead of the arguments
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    /// Stop after this many steps and escalate to a final call
    #[arg(long)]
    pub max_steps: Option<usize>,
    /// Language the agent answers in
    #[arg(long)]
    pub language: Option<String>,
    /// Ask before every non-exempt tool call
    #[arg(long)]
    pub confirm: bool,
    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
    /// Disable logging
    #[arg(long, short)]
    pub quiet: bool,
    #[arg()]
    pub prompt: Vec<String>,
}
