//! STT (Speech-to-Text) types.

use serde::{Deserialize, Serialize};

/// Transcription result from STT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Audio length reported by the server (`verbose_json` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl Transcription {
    /// Audio length in minutes, when the server reported one.
    pub fn audio_minutes(&self) -> Option<f64> {
        self.duration_secs
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d / 60.0)
    }
}

/// Options for STT transcription.
#[derive(Debug, Clone, Default)]
pub struct SttOptions {
    pub language: Option<String>,
    pub prompt: Option<String>,
    /// Upload file name; its extension tells the server the container format.
    pub file_name: Option<String>,
}

impl SttOptions {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}
