//! STT (Speech-to-Text) client.

use super::types::{SttOptions, Transcription};
use crate::inference::DEFAULT_BASE_URL;
use crate::{Error, ErrorContext, Result};
use std::time::Duration;
use tracing::info;

/// Client for speech-to-text transcription.
pub struct SttClient {
    http_client: reqwest::Client,
    model: String,
    base_url: String,
    endpoint_path: String,
    api_key: Option<String>,
}

impl SttClient {
    pub fn builder() -> SttClientBuilder {
        SttClientBuilder::new()
    }

    pub async fn transcribe(&self, audio: &[u8], options: &SttOptions) -> Result<Transcription> {
        if audio.is_empty() {
            return Err(Error::validation_with_context(
                "No audio provided",
                ErrorContext::new().with_source("stt"),
            ));
        }

        let endpoint = format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_path);
        let file_name = options
            .file_name
            .clone()
            .unwrap_or_else(|| "recording.wav".to_string());
        let part = reqwest::multipart::Part::bytes(audio.to_vec()).file_name(file_name);
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = &options.language {
            form = form.text("language", lang.clone());
        }
        if let Some(prompt) = &options.prompt {
            form = form.text("prompt", prompt.clone());
        }

        info!(bytes = audio.len(), model = %self.model, "STT: transcribing");
        let mut request = self.http_client.post(&endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            Error::transcription_with_context(
                format!("STT request failed: {}", e),
                ErrorContext::new().with_source("stt"),
            )
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::transcription_with_context(
                format!("Failed to read STT response: {}", e),
                ErrorContext::new().with_source("stt"),
            )
        })?;
        if !status.is_success() {
            return Err(Error::transcription_with_context(
                format!("STT API error ({}): {}", status, body),
                ErrorContext::new().with_source("stt"),
            ));
        }

        // Servers that ignore `response_format` answer with plain text.
        let transcription = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => Transcription {
                text: json
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .trim()
                    .to_string(),
                language: json.get("language").and_then(|v| v.as_str()).map(String::from),
                duration_secs: json.get("duration").and_then(|v| v.as_f64()),
            },
            Err(_) => Transcription {
                text: body.trim().to_string(),
                language: None,
                duration_secs: None,
            },
        };

        if transcription.text.is_empty() {
            return Err(Error::transcription_with_context(
                "Failed to transcribe audio - no transcript generated",
                ErrorContext::new().with_source("stt"),
            ));
        }
        info!(
            chars = transcription.text.len(),
            duration_secs = ?transcription.duration_secs,
            "STT: transcription complete"
        );
        Ok(transcription)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

pub struct SttClientBuilder {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    endpoint_path: Option<String>,
    timeout: Duration,
}

impl SttClientBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            api_key: None,
            base_url: None,
            endpoint_path: None,
            timeout: Duration::from_secs(120),
        }
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = Some(path.into());
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SttClient> {
        let model = self.model.unwrap_or_else(|| "whisper".to_string());
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint_path = self
            .endpoint_path
            .unwrap_or_else(|| "/audio/transcriptions".to_string());
        let endpoint_path = if endpoint_path.starts_with('/') {
            endpoint_path
        } else {
            format!("/{}", endpoint_path)
        };
        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(SttClient {
            http_client,
            model,
            base_url,
            endpoint_path,
            api_key: self.api_key.filter(|k| !k.is_empty()),
        })
    }
}

impl Default for SttClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
