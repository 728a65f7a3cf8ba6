// Agent loop tests - the ReAct loop driven by a scripted model
//
// Each test scripts the model's completions and checks how many steps ran,
// what the loop returned and what the model was shown.

#[path = "../support/fake_mcp.rs"]
mod fake_mcp;

use fake_mcp::FakeServer;
use parking_lot::Mutex;
use reagent_core::agent::{AgentError, AgentOptions, AgentOutput, LoopState, ReactAgent};
use reagent_core::domain::{ChatMessage, MessageRole, ToolArgs};
use reagent_core::executor::InlineExecutor;
use reagent_core::model::{LanguageModel, ModelError, ModelRequest};
use reagent_core::retry::{RetryError, RetryPolicy};
use reagent_core::tooling::mcp::{McpClient, McpToolGroup};
use reagent_core::tooling::ToolRegistry;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Default)]
struct ScriptedModel {
    responses: Arc<Mutex<VecDeque<String>>>,
    fallback: Option<String>,
    recordings: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedModel {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.iter().map(|r| r.to_string()).collect(),
            )),
            ..Self::default()
        }
    }

    fn then_always(mut self, reply: &str) -> Self {
        self.fallback = Some(reply.to_string());
        self
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().clone()
    }
}

impl LanguageModel for ScriptedModel {
    fn invoke(&self, request: &ModelRequest) -> Result<String, ModelError> {
        self.recordings.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ModelError::Other("no scripted reply left".into()))
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(5), Duration::ZERO)
}

fn run_text(model: &ScriptedModel, registry: ToolRegistry, options: AgentOptions) -> Result<reagent_core::agent::AgentOutcome, AgentError> {
    ReactAgent::new(Arc::new(model.clone()), Arc::new(registry), options)
        .with_retry(policy())
        .run(|task: &str| format!("Task: {task}"), "solve it")
}

fn user_turn(request: &ModelRequest) -> &ChatMessage {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .expect("request has a user turn")
}

#[test]
fn final_answer_after_n_steps_returns_its_answer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = ToolRegistry::new();
    registry
        .register_function("lookup", "Look something up.", &[], move |_: &ToolArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>("a clue")
        })
        .expect("registers");
    let model = ScriptedModel::new(&[
        "Thought: look\nAction: lookup\nAction Input: ",
        "Thought: look again\nAction: lookup\nAction Input: ",
        "Thought: got it\nAction: final_answer\nAction Input: <answer>42</answer>",
    ]);

    let outcome = run_text(&model, registry, AgentOptions::default()).expect("runs");

    assert_eq!(outcome.output, AgentOutput::Text("42".into()));
    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.steps, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(model.requests().len(), 3);
}

#[test]
fn raising_tool_does_not_stop_the_loop() {
    let registry = ToolRegistry::new();
    registry
        .register_function("validate", "Validate input.", &[], |_: &ToolArgs| {
            Err::<String, _>("boom")
        })
        .expect("registers");
    let model = ScriptedModel::new(&[
        "Thought: check\nAction: validate\nAction Input: ",
        "Thought: it raised\nAction: final_answer\nAction Input: <answer>invalid</answer>",
    ]);

    let outcome = run_text(&model, registry, AgentOptions::default()).expect("tool error is absorbed");

    assert_eq!(outcome.output.as_text(), Some("invalid"));
    let second = model.requests().remove(1);
    assert!(user_turn(&second).content.contains("\nObservation: Error: boom\n"));
}

#[test]
fn step_budget_exhaustion_escalates_exactly_once() {
    let model = ScriptedModel::new(&[]).then_always("Thought: again\nAction: clock\nAction Input: ");
    let registry = ToolRegistry::new();
    registry
        .register_function("clock", "Current time.", &[], |_: &ToolArgs| Ok::<_, String>("noon"))
        .expect("registers");

    let outcome = run_text(&model, registry, AgentOptions::default().with_max_steps(2))
        .expect("exhaustion still answers");

    assert_eq!(outcome.state, LoopState::Exhausted);
    assert_eq!(outcome.steps, 2);
    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    let escalation: Vec<_> = requests
        .iter()
        .filter(|r| r.messages[0].content.contains("failed to complete"))
        .collect();
    assert_eq!(escalation.len(), 1);
    assert!(user_turn(escalation[0]).content.contains("Observation: noon"));
    // The final call's reply is returned verbatim.
    assert_eq!(
        outcome.output.as_text(),
        Some("Thought: again\nAction: clock\nAction Input: ")
    );
}

#[test]
fn only_the_latest_action_is_shown() {
    let registry = ToolRegistry::new();
    registry
        .register_function("step", "Advance.", &[], |_: &ToolArgs| Ok::<_, String>("moved"))
        .expect("registers");
    let model = ScriptedModel::new(&[
        "Thought: first move\nAction: step\nAction Input: ",
        "Thought: second move\nAction: step\nAction Input: ",
        "Thought: done\nAction: final_answer\nAction Input: <answer>there</answer>",
    ]);

    run_text(&model, registry, AgentOptions::default()).expect("runs");

    let third = model.requests().remove(2);
    let content = &user_turn(&third).content;
    assert!(content.contains("second move"));
    assert!(!content.contains("first move"));
}

#[test]
fn mcp_image_is_carried_into_next_step() {
    let registry = ToolRegistry::new();
    registry
        .register_mcp_server(McpToolGroup::new(
            McpClient::new("browser", FakeServer::new("browser")),
            Arc::new(InlineExecutor),
        ))
        .expect("registers");
    let model = ScriptedModel::new(&[
        "Thought: look at the page\nAction: browser:snapshot\nAction Input: ",
        "Thought: seen it\nAction: final_answer\nAction Input: <answer>a login form</answer>",
    ]);

    let outcome = run_text(&model, registry, AgentOptions::default()).expect("runs");

    assert_eq!(outcome.output.as_text(), Some("a login form"));
    let requests = model.requests();
    assert_eq!(requests[0].messages.iter().filter(|m| m.image.is_some()).count(), 0);
    assert_eq!(user_turn(&requests[1]).image.as_deref(), Some("iVBORw0KGgo="));
    assert!(requests[0].messages[0].content.contains("browser:snapshot"));
}

#[test]
fn unreachable_model_aborts_the_run() {
    let model = ScriptedModel::new(&[]);

    let err = run_text(&model, ToolRegistry::new(), AgentOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        AgentError::Retry(RetryError::Exhausted { attempts: 3, .. })
    ));
    assert_eq!(model.requests().len(), 3);
    assert!(!err.user_message().is_empty());
}
