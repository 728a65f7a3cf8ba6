use crate::application::parser::ParseError;
use crate::application::retry::RetryError;
use crate::infrastructure::model::{ModelError, StructuredError};
use thiserror::Error;

/// Failures that end a run. Tool failures never appear here; they are
/// recorded as observations instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Retry(#[from] RetryError),
    #[error("structured result could not be decoded: {0}")]
    Structured(#[from] StructuredError),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Retry(err) => err.user_message(),
            AgentError::Structured(_) => {
                "The model's answer did not match the requested format.".to_string()
            }
        }
    }
}

/// One failed model attempt inside a step.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl AttemptError {
    /// A reply that does not parse may parse on the next sample.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Model(err) => err.is_retryable(),
            AttemptError::Parse(_) => true,
        }
    }
}
