//! One reasoning step of the ReAct protocol.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Reserved tool name that ends the loop.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Keyword arguments for a tool call.
pub type ToolArgs = Map<String, Value>;

/// Result of resolving an action's tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub text: String,
    pub image: Option<String>,
}

impl Observation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self::text(format!("Error: {message}"))
    }
}

/// A parsed step: the model's thought, the tool it chose and the arguments.
///
/// The observation is filled in at most once. The first call to
/// [`Action::resolve_with`] runs the resolver; every later call returns the
/// cached value without invoking it again.
#[derive(Debug, Clone)]
pub struct Action {
    pub thought: String,
    pub tool: String,
    pub args: ToolArgs,
    observation: OnceLock<Observation>,
}

impl Action {
    pub fn new(thought: impl Into<String>, tool: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            thought: thought.into(),
            tool: tool.into(),
            args,
            observation: OnceLock::new(),
        }
    }

    /// Builds an already-resolved `final_answer` action.
    pub fn final_answer(thought: impl Into<String>, answer: impl Into<String>) -> Self {
        let answer = answer.into();
        let mut args = ToolArgs::new();
        args.insert("answer".to_string(), Value::String(answer.clone()));
        let action = Self::new(thought, FINAL_ANSWER_TOOL, args);
        let _ = action.observation.set(Observation::text(answer));
        action
    }

    pub fn is_done(&self) -> bool {
        self.tool == FINAL_ANSWER_TOOL
    }

    pub fn resolve_with<F>(&self, resolver: F) -> &Observation
    where
        F: FnOnce(&Action) -> Observation,
    {
        self.observation.get_or_init(|| resolver(self))
    }

    pub fn observation(&self) -> Option<&Observation> {
        self.observation.get()
    }

    pub fn obs(&self) -> Option<&str> {
        self.observation.get().map(|obs| obs.text.as_str())
    }

    pub fn image(&self) -> Option<&str> {
        self.observation
            .get()
            .and_then(|obs| obs.image.as_deref())
    }

    /// Renders the argument map as `<key>value</key>` pairs.
    pub fn render_args(&self) -> String {
        render_args(&self.args)
    }
}

pub fn render_args(args: &ToolArgs) -> String {
    args.iter()
        .map(|(key, value)| format!("<{key}>{}</{key}>", value_text(value)))
        .collect::<Vec<_>>()
        .join("")
}

/// Plain text of an argument value; strings are not JSON-quoted.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tool = if self.is_done() {
            "Finish"
        } else {
            self.tool.as_str()
        };
        write!(
            f,
            "Thought: {}\nAction: {}\nAction Input: {}\nObservation: {}",
            self.thought,
            tool,
            self.render_args(),
            self.obs().unwrap_or_default()
        )
    }
}
