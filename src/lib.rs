//! # medassist
//!
//! Backend for a locally hosted healthcare assistant. User text (chat
//! messages, medical questions, meeting transcripts, recorded audio) is sent
//! to an OpenAI-compatible inference server, and every call is accounted for
//! in tokens and money.
//!
//! ## Overview
//!
//! A [`ResponseGenerator`] runs one completion, estimates input and output
//! tokens, prices them against the local [`tokens::RateTable`], compares them
//! against commercial reference prices, and adds the request to a persisted
//! [`ledger::CostLedger`]. The markdown answer is returned together with its
//! HTML rendering.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medassist::{ResponseGenerator, Settings};
//!
//! #[tokio::main]
//! async fn main() -> medassist::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let generator = ResponseGenerator::from_settings(&settings)?;
//!
//!     let result = generator.chat("What helps with seasonal allergies?").await?;
//!     println!("{}", result.content);
//!     println!("cost: {}", result.cost_data.format());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tokens`] | Token estimation, local cost and commercial comparison |
//! | [`ledger`] | Cumulative cost ledger and its stores |
//! | [`generator`] | Response generator composing the above |
//! | [`assistants`] | Health chat, medical consultation and meeting minutes personas |
//! | [`render`] | Markdown answers to HTML |
//! | [`inference`] | OpenAI-compatible chat completions backend |
//! | [`stt`] | Speech-to-text client |
//! | [`config`] | Environment-driven settings |
//! | [`types`] | Messages and model identifiers |

pub mod assistants;
pub mod config;
pub mod generator;
pub mod inference;
pub mod ledger;
pub mod render;
pub mod stt;
pub mod tokens;
pub mod types;

// Re-export main types for convenience
pub use assistants::{Assistant, AudioMinutes};
pub use config::Settings;
pub use generator::{GenerationResult, ResponseGenerator, ResponseGeneratorBuilder};
pub use ledger::{CostLedger, LedgerState};
pub use types::{Message, MessageRole, ModelId};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
