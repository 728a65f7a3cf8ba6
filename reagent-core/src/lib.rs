pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, executor, parser, retry, tooling};
pub use config::AppConfig;
pub use domain::{Action, ChatMessage, Observation, Prompt, ToolArgs};
pub use infrastructure::model;
