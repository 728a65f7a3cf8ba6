//! Prompt assembly for ReAct steps and the final call.

use super::models::AgentOptions;
use crate::application::tooling::ToolDescriptor;
use crate::domain::{Action, ChatMessage, FINAL_ANSWER_TOOL, Prompt};

/// Generation stops here so the model never writes its own observation.
pub const OBSERVATION_STOP: &str = "Observation:";

pub const THOUGHT_CUE: &str = "Thought:";

const REACT_TEMPLATE: &str = "\
You are an agent that solves the user's task step by step using tools.

You have access to the following tools:
{tools}

Use exactly this format:

Thought: reason about what to do next
Action: the tool to call, one of [{tool_names}]
Action Input: the arguments, one <name>value</name> tag per argument
Observation: the result of the tool call

Thought, Action, Action Input and Observation may repeat. Never write the \
Observation yourself, stop after Action Input and wait for it.

When you know the answer, finish with:

Thought: I now know the final answer
Action: final_answer
Action Input: <answer>the final answer</answer>";

const FINISHED_TEMPLATE: &str = "\
The agent has completed the task below. Its reasoning history is included. \
Convert the final answer into the requested output format. Use only \
information from the history and reply with the formatted result alone.";

const ESCALATION_TEMPLATE: &str = "\
The agent failed to complete the task below within its step budget. Its \
reasoning history is included. You must now produce the best final answer \
you can from that history. If the task could not be solved, say what is \
missing.";

/// Which framing the final call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalCall {
    /// The loop finished; the answer only needs converting.
    Convert,
    /// The step budget ran out before a final answer.
    Escalate,
}

pub fn system_prompt(tools: &[ToolDescriptor], options: &AgentOptions) -> String {
    let mut listing: Vec<String> = tools.iter().map(describe_tool).collect();
    listing.push(format!(
        "- {FINAL_ANSWER_TOOL}: Return the final answer to the user. \
         Arguments: {{\"type\":\"object\",\"properties\":{{\"answer\":{{\"type\":\"string\"}}}},\"required\":[\"answer\"]}}"
    ));

    let mut names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    names.push(FINAL_ANSWER_TOOL);

    let mut prompt = REACT_TEMPLATE
        .replace("{tools}", &listing.join("\n"))
        .replace("{tool_names}", &names.join(", "));

    if let Some(extra) = options
        .extra_instructions
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        prompt.push_str("\n\n");
        prompt.push_str(extra);
    }
    prompt.push_str(&format!(
        "\n\nAlways write the Thought and the final answer in {}.",
        options.language
    ));
    prompt
}

fn describe_tool(tool: &ToolDescriptor) -> String {
    let mut line = format!("- {}", tool.name);
    if !tool.description.trim().is_empty() {
        line.push_str(&format!(": {}", tool.description.trim()));
    }
    let schema = serde_json::to_string(&tool.args_schema).unwrap_or_default();
    line.push_str(&format!(" Arguments: {schema}"));
    line
}

/// Messages for one step: the system prompt, the task, and the most recent
/// action if there is one. The previous observation's image rides along on
/// the last user turn.
pub fn step_messages(system: String, task: Prompt, previous: Option<&Action>) -> Vec<ChatMessage> {
    let image = previous.and_then(|action| action.image()).map(str::to_string);
    let mut messages = vec![ChatMessage::system(system)];

    match task {
        Prompt::Text(text) => {
            let content = match previous {
                Some(action) => format!("{text}\n{action}\n{THOUGHT_CUE}"),
                None => text,
            };
            messages.push(ChatMessage::user(content).with_image(image));
        }
        Prompt::Messages(history) => {
            messages.extend(history);
            if let Some(action) = previous {
                messages.push(ChatMessage::assistant(action.to_string()));
            }
            if image.is_some() {
                messages.push(
                    ChatMessage::user("Image returned by the last tool call.").with_image(image),
                );
            }
        }
    }
    messages
}

/// Messages for the one-shot final call over a finished or exhausted run.
pub fn final_call_messages(
    kind: FinalCall,
    task: Prompt,
    history: &[Action],
    options: &AgentOptions,
) -> Vec<ChatMessage> {
    let framing = match kind {
        FinalCall::Convert => FINISHED_TEMPLATE,
        FinalCall::Escalate => ESCALATION_TEMPLATE,
    };
    let system = format!(
        "{framing}\n\nAnswer in {}.",
        options.language
    );
    let transcript = render_history(history);

    let mut messages = vec![ChatMessage::system(system)];
    match task {
        Prompt::Text(text) => {
            messages.push(ChatMessage::user(format!(
                "Task:\n{text}\n\nHistory:\n{transcript}"
            )));
        }
        Prompt::Messages(conversation) => {
            messages.extend(conversation);
            messages.push(ChatMessage::user(format!("History:\n{transcript}")));
        }
    }
    messages
}

pub fn render_history(history: &[Action]) -> String {
    history
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
