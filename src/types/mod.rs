//! Core data types shared by the inference client, tokenizer and rate tables.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | Message role (system, user, assistant) |
//! | [`ModelId`] | Normalized model identifier used as a table key |

pub mod message;
pub mod model;

pub use message::{Message, MessageRole};
pub use model::ModelId;
