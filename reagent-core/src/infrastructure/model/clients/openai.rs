//! OpenAI-compatible client implementation

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::executor::TaskExecutor;
use crate::config::ModelConfig;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::LanguageModel;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ResponseFormat};

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// Requests run on the shared background executor; [`LanguageModel::invoke`]
/// blocks the calling thread until the reply arrives.
#[derive(Clone)]
pub struct OpenAiChatModel {
    endpoint: String,
    api_key: Option<String>,
    completions_url: String,
    default_model: String,
    http: Client,
    executor: Arc<dyn TaskExecutor>,
}

impl OpenAiChatModel {
    pub fn from_config(config: &ModelConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            completions_url: join_url(&config.endpoint, &config.api_path),
            default_model: config.model.clone(),
            http: Client::new(),
            executor,
        }
    }

    pub async fn chat(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let model = if request.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let payload = OpenAIRequest {
            model,
            messages: MessageAdapter::to_openai_format(&request.messages),
            stream: false,
            stop: request.stop.clone(),
            response_format: request.response_format.as_ref().map(json_schema_format),
        };

        info!(
            endpoint = self.endpoint.as_str(),
            model = payload.model.as_str(),
            messages = request.messages.len(),
            "Sending request to OpenAI-compatible endpoint"
        );

        // Local servers usually run without a key; send no header then.
        let mut post = self.http.post(&self.completions_url).json(&payload);
        if let Some(key) = &self.api_key {
            post = post.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        let response = post
            .send()
            .await
            .map_err(|err| ModelError::network(&self.endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = self.endpoint.as_str(), %status, "model endpoint refused request");
            return Err(ModelError::Status {
                endpoint: self.endpoint.clone(),
                status,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let reply: OpenAIResponse = response
            .json()
            .await
            .map_err(|err| ModelError::invalid_response(&self.endpoint, err.to_string()))?;
        debug!("Received response from OpenAI-compatible endpoint");

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| ModelError::invalid_response(&self.endpoint, "missing content"))
    }
}

const ERROR_BODY_LIMIT: usize = 512;

fn join_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text.to_string(),
    }
}

impl LanguageModel for OpenAiChatModel {
    fn invoke(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let client = self.clone();
        let request = request.clone();
        self.executor
            .block_on(async move { client.chat(&request).await })?
    }
}

fn json_schema_format(format: &ResponseFormat) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": format.name,
            "schema": format.schema,
            "strict": true
        }
    })
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}
