use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error
    /// (e.g., "MEDASSIST_INPUT_COST_PER_1K", "choices[0].message.content")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "inference", "ledger_store")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the assistant backend.
///
/// Only [`Error::Inference`] is returned by [`crate::ResponseGenerator::generate`];
/// ledger and tokenizer problems are absorbed where they happen.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Inference error: {message}{}", format_context(.context))]
    Inference {
        message: String,
        context: ErrorContext,
    },

    #[error("Transcription error: {message}{}", format_context(.context))]
    Transcription {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Ledger error: {message}{}", format_context(.context))]
    Ledger {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rate file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::inference_with_context(msg, ErrorContext::new())
    }

    pub fn inference_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Inference {
            message: msg.into(),
            context,
        }
    }

    pub fn transcription_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Transcription {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn ledger_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Ledger {
            message: msg.into(),
            context,
        }
    }

    /// True for failures of the inference backend call.
    pub fn is_inference(&self) -> bool {
        matches!(self, Error::Inference { .. })
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Inference { context, .. }
            | Error::Transcription { context, .. }
            | Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Ledger { context, .. } => Some(context),
            _ => None,
        }
    }
}
