//! Parses raw model completions into [`Action`]s.
//!
//! The expected shape is the ReAct text protocol:
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <key>value</key>...   (or a JSON object)
//! Observation: <filled in by the runtime>
//! ```
//!
//! The *last* `Action:` / `Action Input:` pair wins, so a model that quotes the
//! protocol inside its reasoning still yields the action it actually chose.

mod arguments;

pub use arguments::parse_arguments;
pub(crate) use arguments::extract_json;

use crate::domain::Action;
use thiserror::Error;

const ACTION_MARKER: &str = "\nAction:";
const INPUT_MARKER: &str = "\nAction Input:";
const OBSERVATION_MARKER: &str = "\nObservation:";
const THOUGHT_LABEL: &str = "Thought:";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("cannot parse, no Action or Action Input")]
    MissingMarkers,
    #[error("cannot parse, Action names no tool")]
    EmptyTool,
    #[error("mismatched argument tags: <{open}> closed by </{close}>")]
    MismatchedTag { open: String, close: String },
    #[error("argument tag <{0}> is never closed")]
    UnclosedTag(String),
    #[error("malformed action input: {0}")]
    MalformedArguments(String),
}

pub fn parse_action(raw: &str) -> Result<Action, ParseError> {
    // A leading newline lets a completion that starts directly with
    // `Action:` match the same markers as one that starts with a thought.
    let mut text = format!("\n{}", raw.trim());

    let action_at = text.rfind(ACTION_MARKER);
    let input_at = text.rfind(INPUT_MARKER);
    let (action_at, input_at) = match (action_at, input_at) {
        (Some(action), Some(input)) if action < input => (action, input),
        _ => return Err(ParseError::MissingMarkers),
    };

    let observation_at = match text.rfind(OBSERVATION_MARKER) {
        Some(at) if at > input_at => at,
        _ => {
            let at = text.len();
            text.push_str(OBSERVATION_MARKER);
            at
        }
    };

    let tool = clean_tool_name(&text[action_at + ACTION_MARKER.len()..input_at]);
    if tool.is_empty() {
        return Err(ParseError::EmptyTool);
    }

    let args = parse_arguments(&text[input_at + INPUT_MARKER.len()..observation_at])?;

    let thought = text[..action_at].trim();
    let thought = thought
        .strip_prefix(THOUGHT_LABEL)
        .unwrap_or(thought)
        .trim();

    Ok(Action::new(thought, tool, args))
}

fn clean_tool_name(raw: &str) -> String {
    let without_comment = raw.split('#').next().unwrap_or_default();
    without_comment.trim().trim_matches('`').trim().to_string()
}
