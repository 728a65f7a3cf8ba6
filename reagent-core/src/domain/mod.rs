pub mod action;
pub mod types;

pub use action::{Action, FINAL_ANSWER_TOOL, Observation, ToolArgs};
pub use types::{ChatMessage, MessageRole, Prompt};
