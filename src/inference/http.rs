use super::InferenceBackend;
use crate::types::Message;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8553/v1/openai";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Non-streaming client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatBackend {
    http_client: reqwest::Client,
    base_url: String,
    endpoint_path: String,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    pub fn builder() -> OpenAiCompatBackendBuilder {
        OpenAiCompatBackendBuilder::new()
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_path)
    }

    fn inference_error(message: String, field: Option<&str>) -> Error {
        let mut ctx = ErrorContext::new().with_source("inference");
        if let Some(field) = field {
            ctx = ctx.with_field_path(field);
        }
        Error::inference_with_context(message, ctx)
    }
}

#[async_trait]
impl InferenceBackend for OpenAiCompatBackend {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String> {
        let endpoint = self.endpoint();
        let body = ChatCompletionRequest {
            model,
            messages,
            stream: false,
        };

        let mut request = self.http_client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("inference request to {} timed out", endpoint)
            } else {
                format!("inference request failed: {}", e)
            };
            Self::inference_error(message, None)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            let message = if e.is_timeout() {
                "timed out reading inference response".to_string()
            } else {
                format!("failed to read inference response: {}", e)
            };
            Self::inference_error(message, None)
        })?;
        if !status.is_success() {
            return Err(Self::inference_error(
                format!("inference API error ({}): {}", status, text),
                None,
            ));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            Self::inference_error(format!("malformed inference response: {}", e), None)
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                Self::inference_error(
                    "inference response has no content".to_string(),
                    Some("choices[0].message.content"),
                )
            })?;

        debug!(model, chars = content.len(), "inference completed");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai_compat"
    }
}

pub struct OpenAiCompatBackendBuilder {
    base_url: Option<String>,
    endpoint_path: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiCompatBackendBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            endpoint_path: None,
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = Some(path.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenAiCompatBackend> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint_path = self
            .endpoint_path
            .unwrap_or_else(|| "/chat/completions".to_string());
        let endpoint_path = if endpoint_path.starts_with('/') {
            endpoint_path
        } else {
            format!("/{}", endpoint_path)
        };
        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(OpenAiCompatBackend {
            http_client,
            base_url,
            endpoint_path,
            api_key: self.api_key.filter(|k| !k.is_empty()),
        })
    }
}

impl Default for OpenAiCompatBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
