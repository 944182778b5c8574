//! Speech-to-text: transcribe recorded audio through an OpenAI-compatible
//! `/audio/transcriptions` endpoint (Whisper on the local inference server).

mod client;
mod types;

pub use client::{SttClient, SttClientBuilder};
pub use types::{SttOptions, Transcription};
