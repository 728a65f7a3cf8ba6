//! Model types - Request and Error types

use crate::application::executor::ExecutorError;
use crate::domain::ChatMessage;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// A JSON-Schema the reply must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

impl ResponseFormat {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// One blocking chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Generation halts before any of these strings is emitted.
    pub stop: Vec<String>,
    pub response_format: Option<ResponseFormat>,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stop: Vec::new(),
            response_format: None,
        }
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    pub fn with_response_format(mut self, format: Option<ResponseFormat>) -> Self {
        self.response_format = format;
        self
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error calling '{endpoint}': {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("'{endpoint}' answered {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("'{endpoint}' returned invalid response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// Used by scripted and test models.
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Client errors other than timeouts and rate limits will not go away on
    /// retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Status { status, .. } => {
                !status.is_client_error()
                    || matches!(
                        *status,
                        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
                    )
            }
            _ => true,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ModelError::Network { endpoint, source } => {
                if source.is_connect() {
                    format!("Could not connect to the model endpoint '{endpoint}'.")
                } else if source.is_timeout() {
                    format!("The request to '{endpoint}' timed out.")
                } else {
                    format!("Network error talking to '{endpoint}'.")
                }
            }
            ModelError::Status { endpoint, status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    format!("The model endpoint '{endpoint}' rejected the API key.")
                }
                StatusCode::NOT_FOUND => format!("Endpoint '{endpoint}' was not found."),
                StatusCode::TOO_MANY_REQUESTS => {
                    format!("The model endpoint '{endpoint}' is rate limiting requests.")
                }
                StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                    format!("The model endpoint '{endpoint}' is unavailable.")
                }
                other => format!("The request to '{endpoint}' failed: {}", other.as_u16()),
            },
            ModelError::InvalidResponse { endpoint, .. } => {
                format!("The response from '{endpoint}' was not valid.")
            }
            ModelError::Executor(err) => format!("Internal runtime error: {err}"),
            ModelError::Other(message) => message.clone(),
        }
    }
}
