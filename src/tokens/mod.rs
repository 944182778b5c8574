//! # Token Counting and Cost Estimation Module
//!
//! Turns text into token counts and token counts into money.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TokenEstimator`] | Ordered cascade of counting strategies; first success wins |
//! | [`ExactEncoding`] | Sub-word encoder lookup by model family |
//! | [`CharacterHeuristic`] | `chars / 4 + symbols / 2` approximation |
//! | [`WordCount`] | Legacy word-tokenizer count |
//! | [`RateTable`] | Per-model rates for the local deployment |
//! | [`CostBreakdown`] | Input, output and audio cost of one request |
//! | [`CommercialRateTable`] | Reference prices for comparison display |
//!
//! ## Example
//!
//! ```rust
//! use medassist::tokens::{RateTable, TokenEstimator};
//! use medassist::types::ModelId;
//!
//! let model = ModelId::new("qwen2.5");
//! let estimator = TokenEstimator::new();
//! let input = estimator.estimate("syshello", &model);
//! let output = estimator.estimate("world", &model);
//!
//! let cost = RateTable::local_defaults().calculate_cost(&model, input, output, None);
//! assert_eq!(input + output, 3);
//! assert_eq!(cost.request_cost, 0.0);
//! ```
//!
//! ## Estimation Accuracy
//!
//! | Method | Accuracy | Use Case |
//! |--------|----------|----------|
//! | Exact encoder | Exact | OpenAI model families (`tiktoken` feature) |
//! | Character heuristic | Rough | Local models, unknown families |
//! | Word count | Rough, lower | Legacy stored counts |

mod commercial;
mod counter;
mod pricing;

pub use commercial::{CommercialCost, CommercialRate, CommercialRateTable};
pub use counter::{
    approximate_tokens, count_words, CharacterHeuristic, CountStrategy, EncoderRegistry,
    ExactEncoding, SubwordEncoder, TokenEstimator, TokenizeError, WordCount,
    DEFAULT_LOCAL_FAMILIES,
};
#[cfg(feature = "tiktoken")]
pub use counter::TiktokenEncoder;
pub use pricing::{round_cost, CostBreakdown, ModelRate, RateTable};

use serde::{Deserialize, Serialize};

/// Token counts of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}
