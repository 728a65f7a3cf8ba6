use super::approval::{AutoApprove, CANCELLED_OBSERVATION, ToolApproval};
use super::errors::AttemptError;
use super::models::AgentOptions;
use super::prompts::{self, FinalCall, OBSERVATION_STOP};
use crate::application::parser::parse_action;
use crate::application::retry::{RetryError, RetryPolicy};
use crate::application::tooling::ToolRegistry;
use crate::domain::action::value_text;
use crate::domain::{Action, Observation, Prompt, ToolArgs};
use crate::infrastructure::model::{LanguageModel, ModelError, ModelRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one ReAct iteration: prompt, model call, parse, tool call.
pub struct StepController {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    approval: Arc<dyn ToolApproval>,
    retry: RetryPolicy,
    options: AgentOptions,
}

impl StepController {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        options: AgentOptions,
    ) -> Self {
        Self {
            model,
            registry,
            approval: Arc::new(AutoApprove),
            retry: RetryPolicy::default(),
            options,
        }
    }

    pub fn with_approval(mut self, approval: Arc<dyn ToolApproval>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Produces the next resolved action. `task` is rendered afresh for every
    /// step; only the most recent entry of `history` is shown to the model.
    ///
    /// Fails only when the model cannot produce a parseable action within
    /// the retry budget. Tool failures become observations.
    pub fn step(&self, task: &dyn Fn() -> Prompt, history: &[Action]) -> Result<Action, RetryError> {
        let system = prompts::system_prompt(&self.registry.descriptors(), &self.options);
        let messages = prompts::step_messages(system, task(), history.last());
        let request =
            ModelRequest::new(self.options.model.clone(), messages).with_stop(OBSERVATION_STOP);

        let model = Arc::clone(&self.model);
        let action = self.retry.run_with(
            "react step",
            move || -> Result<Action, AttemptError> {
                let raw = model.invoke(&request)?;
                debug!(completion = %raw, "model completion");
                Ok(parse_action(&raw)?)
            },
            AttemptError::is_retryable,
        )?;

        action.resolve_with(|action| self.resolve(action));
        Ok(action)
    }

    fn resolve(&self, action: &Action) -> Observation {
        if action.is_done() {
            return Observation::text(final_answer_text(&action.args));
        }

        if self.options.require_confirmation
            && !self.options.is_exempt(&action.tool)
            && !self.approval.approve(action)
        {
            info!(tool = %action.tool, "tool call declined");
            return Observation::text(CANCELLED_OBSERVATION);
        }

        info!(tool = %action.tool, "calling tool");
        match self.registry.call(&action.tool, &action.args) {
            Ok(output) => Observation::text(output.text).with_image(output.image),
            Err(err) => {
                warn!(tool = %action.tool, error = %err, "tool call failed");
                Observation::error(err)
            }
        }
    }

    /// One-shot call over the whole history, used after the loop stops.
    pub fn final_call(
        &self,
        kind: FinalCall,
        task: Prompt,
        history: &[Action],
    ) -> Result<String, RetryError> {
        let messages = prompts::final_call_messages(kind, task, history, &self.options);
        let request = ModelRequest::new(self.options.model.clone(), messages)
            .with_response_format(self.options.response_format.clone());

        let model = Arc::clone(&self.model);
        self.retry.run_with(
            "final call",
            move || model.invoke(&request),
            ModelError::is_retryable,
        )
    }
}

/// `answer` if present, else the only argument, else the whole map as JSON.
fn final_answer_text(args: &ToolArgs) -> String {
    if let Some(answer) = args.get("answer") {
        return value_text(answer);
    }
    match args.len() {
        0 => String::new(),
        1 => args.values().next().map(value_text).unwrap_or_default(),
        _ => Value::Object(args.clone()).to_string(),
    }
}
