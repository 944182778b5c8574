//! Inference backend seam.
//!
//! The generator only needs "messages in, text out"; [`OpenAiCompatBackend`]
//! speaks that to a local OpenAI-compatible server, tests substitute their own.

mod http;

pub use http::{OpenAiCompatBackend, OpenAiCompatBackendBuilder, DEFAULT_BASE_URL};

use crate::types::Message;
use crate::Result;
use async_trait::async_trait;

/// A synchronous (request/response) chat model.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Generated text for `messages`. Every failure is [`crate::Error::Inference`].
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String>;

    fn name(&self) -> &'static str;
}
