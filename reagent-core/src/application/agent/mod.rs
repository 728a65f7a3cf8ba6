//! # Agent Module
//!
//! The ReAct loop: the model alternates free-text reasoning with tool calls
//! until it calls `final_answer` or runs out of steps.
//!
//! ## Key Types
//!
//! - [`ReactAgent`] - Loop driver, the entry point for running a task
//! - [`StepController`] - One prompt, model call, parse and tool call
//! - [`AgentOptions`] - Step budget, language, confirmation and output format
//! - [`AgentOutcome`] - Output plus the state the loop ended in
//! - [`ToolApproval`] - Gate consulted before non-exempt tool calls
//! - [`AgentError`] - Failures that end a run
//!
//! ## Agent Loop
//!
//! 1. Render the task and append the most recent action
//! 2. Ask the model for the next action, stopping at `Observation:`
//! 3. Parse the reply (a reply that does not parse is retried)
//! 4. Run the tool; errors become the observation
//! 5. Stop on `final_answer` or when `max_steps` is reached
//!
//! A run that reaches `max_steps` still returns an answer, produced by a
//! final call over the history.

mod approval;
mod errors;
mod models;
mod prompts;
mod runner;
mod step;

pub use approval::{AutoApprove, CANCELLED_OBSERVATION, ConsoleApproval, ToolApproval};
pub use errors::AgentError;
pub use models::{AgentOptions, AgentOutcome, AgentOutput, LoopState};
pub use prompts::{FinalCall, OBSERVATION_STOP};
pub use runner::ReactAgent;
pub use step::StepController;
