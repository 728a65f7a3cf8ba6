use super::approval::ToolApproval;
use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome, AgentOutput, LoopState};
use super::prompts::FinalCall;
use super::step::StepController;
use crate::application::retry::RetryPolicy;
use crate::application::tooling::ToolRegistry;
use crate::domain::{Action, Prompt};
use crate::infrastructure::model::{LanguageModel, structured};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Drives [`StepController`] until a final answer or the step budget.
pub struct ReactAgent {
    controller: StepController,
}

impl ReactAgent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        options: AgentOptions,
    ) -> Self {
        Self {
            controller: StepController::new(model, registry, options),
        }
    }

    pub fn with_approval(mut self, approval: Arc<dyn ToolApproval>) -> Self {
        self.controller = self.controller.with_approval(approval);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.controller = self.controller.with_retry(retry);
        self
    }

    pub fn options(&self) -> &AgentOptions {
        self.controller.options()
    }

    /// Runs the task to completion. `task` renders the prompt from `inputs`
    /// and is called again for every step.
    ///
    /// Exhausting `max_steps` is not an error: the result then comes from a
    /// best-effort final call over the history.
    pub fn run<I, F, P>(&self, task: F, inputs: &I) -> Result<AgentOutcome, AgentError>
    where
        I: ?Sized,
        F: Fn(&I) -> P,
        P: Into<Prompt>,
    {
        let render = || -> Prompt { task(inputs).into() };
        let max_steps = self.options().max_steps;
        let mut history: Vec<Action> = Vec::new();
        let mut state = LoopState::Stepping;

        let run_id = Uuid::new_v4();
        let _span = info_span!("react_run", %run_id).entered();
        info!(?max_steps, "starting ReAct run");
        while state == LoopState::Stepping {
            if max_steps.is_some_and(|limit| history.len() >= limit) {
                state = LoopState::Exhausted;
                break;
            }

            let action = self.controller.step(&render, &history)?;
            info!(step = history.len() + 1, tool = %action.tool, "step resolved");
            debug!("{action}");

            if action.is_done() {
                state = LoopState::Done;
            }
            history.push(action);
        }

        let output = match state {
            LoopState::Done => self.finish(render(), &history)?,
            _ => self.escalate(render(), &history)?,
        };
        info!(steps = history.len(), ?state, "ReAct run finished");

        Ok(AgentOutcome {
            output,
            state,
            steps: history.len(),
        })
    }

    /// Runs the task and decodes the answer into `T`.
    pub fn run_structured<T, I, F, P>(&self, task: F, inputs: &I) -> Result<T, AgentError>
    where
        T: DeserializeOwned,
        I: ?Sized,
        F: Fn(&I) -> P,
        P: Into<Prompt>,
    {
        let outcome = self.run(task, inputs)?;
        let decoded = match outcome.output {
            AgentOutput::Structured(value) => structured::decode_value(value)?,
            AgentOutput::Text(text) => structured::decode(&text)?,
        };
        Ok(decoded)
    }

    fn finish(&self, task: Prompt, history: &[Action]) -> Result<AgentOutput, AgentError> {
        let answer = history
            .last()
            .and_then(Action::obs)
            .unwrap_or_default()
            .to_string();

        if self.options().response_format.is_none() {
            return Ok(AgentOutput::Text(answer));
        }

        let raw = self.controller.final_call(FinalCall::Convert, task, history)?;
        Ok(AgentOutput::Structured(structured::extract(&raw)?))
    }

    fn escalate(&self, task: Prompt, history: &[Action]) -> Result<AgentOutput, AgentError> {
        warn!(
            steps = history.len(),
            "step budget exhausted without a final answer; escalating"
        );
        let raw = self.controller.final_call(FinalCall::Escalate, task, history)?;

        if self.options().response_format.is_some() {
            Ok(AgentOutput::Structured(structured::extract(&raw)?))
        } else {
            Ok(AgentOutput::Text(raw))
        }
    }
}
