use crate::config::AgentSettings;
use crate::config::defaults::{DEFAULT_CONFIRMATION_EXEMPT, DEFAULT_LANGUAGE};
use crate::infrastructure::model::ResponseFormat;
use serde_json::Value;
use std::fmt;

/// Per-run behaviour of the ReAct loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    /// Model id passed to the language model; empty means its default.
    pub model: String,
    /// `None` runs until a final answer.
    pub max_steps: Option<usize>,
    pub language: String,
    pub extra_instructions: Option<String>,
    pub require_confirmation: bool,
    pub confirmation_exempt: Vec<String>,
    /// When set, the answer is converted to this shape by a final call.
    pub response_format: Option<ResponseFormat>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_steps: None,
            language: DEFAULT_LANGUAGE.to_string(),
            extra_instructions: None,
            require_confirmation: false,
            confirmation_exempt: DEFAULT_CONFIRMATION_EXEMPT
                .iter()
                .map(|name| name.to_string())
                .collect(),
            response_format: None,
        }
    }
}

impl AgentOptions {
    pub fn from_settings(settings: &AgentSettings, model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_steps: settings.max_steps,
            language: settings.language.clone(),
            extra_instructions: settings.extra_instructions.clone(),
            require_confirmation: settings.require_confirmation,
            confirmation_exempt: settings.confirmation_exempt.clone(),
            response_format: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = Some(instructions.into());
        self
    }

    pub fn is_exempt(&self, tool: &str) -> bool {
        self.confirmation_exempt.iter().any(|name| name == tool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stepping,
    Done,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Text(String),
    Structured(Value),
}

impl AgentOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AgentOutput::Text(text) => Some(text),
            AgentOutput::Structured(_) => None,
        }
    }
}

impl fmt::Display for AgentOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentOutput::Text(text) => f.write_str(text),
            AgentOutput::Structured(value) => write!(f, "{value:#}"),
        }
    }
}

/// What a finished run returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub output: AgentOutput,
    /// `Done` or `Exhausted`.
    pub state: LoopState,
    pub steps: usize,
}
