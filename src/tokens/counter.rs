//! Token counting strategies and the estimator cascade.

use crate::types::ModelId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static WORD_OR_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|[^\w\s]").expect("static regex"));

/// Model families served by the local inference server. No exact encoder is
/// shipped for them, so the exact strategy is skipped outright.
pub const DEFAULT_LOCAL_FAMILIES: &[&str] =
    &["qwen", "llama", "mistral", "gemma", "phi", "whisper"];

/// Why a counting strategy declined to produce a count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("exact encoding skipped for local model '{0}'")]
    LocalModel(String),

    #[error("no exact encoder registered for '{0}'")]
    NoEncoder(String),

    #[error("encoder '{encoder}' failed: {message}")]
    Encode {
        encoder: &'static str,
        message: String,
    },
}

/// A sub-word encoder able to produce an exact token count for one model family.
pub trait SubwordEncoder: Send + Sync {
    fn encode_len(&self, text: &str) -> Result<usize, TokenizeError>;

    fn name(&self) -> &'static str;
}

/// One step of the counting cascade.
pub trait CountStrategy: Send + Sync {
    fn count(&self, text: &str, model_hint: &ModelId) -> Result<usize, TokenizeError>;

    fn name(&self) -> &'static str;
}

/// Family-prefix → encoder lookup. The longest matching prefix wins.
#[derive(Clone, Default)]
pub struct EncoderRegistry {
    entries: Vec<(String, Arc<dyn SubwordEncoder>)>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the BPE tables bundled by `tiktoken-rs`.
    /// Empty when the `tiktoken` feature is disabled.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "tiktoken")]
        {
            let o200k: Arc<dyn SubwordEncoder> = Arc::new(TiktokenEncoder::o200k_base());
            let cl100k: Arc<dyn SubwordEncoder> = Arc::new(TiktokenEncoder::cl100k_base());
            for family in ["gpt-4o", "gpt-4.1", "o1", "o3", "o4"] {
                registry = registry.register(family, o200k.clone());
            }
            for family in ["gpt-4", "gpt-3.5", "text-embedding"] {
                registry = registry.register(family, cl100k.clone());
            }
        }
        registry
    }

    pub fn register(mut self, family: impl AsRef<str>, encoder: Arc<dyn SubwordEncoder>) -> Self {
        self.entries.push((ModelId::new(family).as_str().to_string(), encoder));
        self
    }

    pub fn lookup(&self, model: &ModelId) -> Option<Arc<dyn SubwordEncoder>> {
        self.entries
            .iter()
            .filter(|(family, _)| model.is_family(family))
            .max_by_key(|(family, _)| family.len())
            .map(|(_, encoder)| encoder.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exact strategy: delegates to the registered encoder for the hint's family.
pub struct ExactEncoding {
    registry: EncoderRegistry,
    local_families: Vec<String>,
}

impl ExactEncoding {
    pub fn new(registry: EncoderRegistry) -> Self {
        Self {
            registry,
            local_families: DEFAULT_LOCAL_FAMILIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_local_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_families = families.into_iter().map(Into::into).collect();
        self
    }

    fn is_local(&self, model: &ModelId) -> bool {
        self.local_families.iter().any(|f| model.is_family(f))
    }
}

impl CountStrategy for ExactEncoding {
    fn count(&self, text: &str, model_hint: &ModelId) -> Result<usize, TokenizeError> {
        if self.is_local(model_hint) {
            return Err(TokenizeError::LocalModel(model_hint.to_string()));
        }
        let encoder = self
            .registry
            .lookup(model_hint)
            .ok_or_else(|| TokenizeError::NoEncoder(model_hint.to_string()))?;
        encoder.encode_len(text)
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Character heuristic: roughly four characters per token, with every
/// symbol counted as an extra half token.
#[derive(Debug, Clone)]
pub struct CharacterHeuristic {
    chars_per_token: f64,
    symbol_weight: f64,
}

impl CharacterHeuristic {
    pub fn new() -> Self {
        Self {
            chars_per_token: 4.0,
            symbol_weight: 0.5,
        }
    }

    pub fn approximate(&self, text: &str) -> usize {
        let normalized = WHITESPACE_RUN.replace_all(text, " ");
        let normalized = normalized.trim();
        if normalized.is_empty() {
            return 0;
        }
        let chars = normalized.chars().count() as f64;
        let symbols = normalized
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count() as f64;
        (chars / self.chars_per_token + self.symbol_weight * symbols).floor() as usize
    }
}

impl Default for CharacterHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl CountStrategy for CharacterHeuristic {
    fn count(&self, text: &str, _model_hint: &ModelId) -> Result<usize, TokenizeError> {
        Ok(self.approximate(text))
    }

    fn name(&self) -> &'static str {
        "character_heuristic"
    }
}

/// Legacy word count: every run of word characters and every standalone
/// symbol is one token. Kept for callers that stored counts in this unit.
#[derive(Debug, Clone, Default)]
pub struct WordCount;

impl CountStrategy for WordCount {
    fn count(&self, text: &str, _model_hint: &ModelId) -> Result<usize, TokenizeError> {
        Ok(count_words(text))
    }

    fn name(&self) -> &'static str {
        "word_count"
    }
}

/// Character-heuristic token estimate, independent of any model.
pub fn approximate_tokens(text: &str) -> usize {
    CharacterHeuristic::new().approximate(text)
}

/// Legacy word-tokenizer count.
pub fn count_words(text: &str) -> usize {
    WORD_OR_SYMBOL.find_iter(text).count()
}

/// Ordered cascade of counting strategies; the first success wins.
pub struct TokenEstimator {
    strategies: Vec<Box<dyn CountStrategy>>,
    fallback: CharacterHeuristic,
}

impl TokenEstimator {
    /// Default cascade: exact encoder (when one is registered) → character heuristic.
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(ExactEncoding::new(EncoderRegistry::with_defaults())),
            Box::new(CharacterHeuristic::new()),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn CountStrategy>>) -> Self {
        Self {
            strategies,
            fallback: CharacterHeuristic::new(),
        }
    }

    /// Estimate the token count of `text` for `model_hint`. Never fails.
    pub fn estimate(&self, text: &str, model_hint: &ModelId) -> usize {
        if text.is_empty() {
            return 0;
        }
        for strategy in &self.strategies {
            match strategy.count(text, model_hint) {
                Ok(n) => return n,
                Err(e) => debug!(
                    strategy = strategy.name(),
                    model = %model_hint,
                    error = %e,
                    "token count strategy fell through"
                ),
            }
        }
        self.fallback.approximate(text)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tiktoken")]
pub use tiktoken::TiktokenEncoder;

#[cfg(feature = "tiktoken")]
mod tiktoken {
    use super::{SubwordEncoder, TokenizeError};
    use once_cell::sync::OnceCell;
    use tiktoken_rs::CoreBPE;

    type Loader = fn() -> anyhow::Result<CoreBPE>;

    /// `tiktoken-rs` BPE table, loaded on first use.
    pub struct TiktokenEncoder {
        name: &'static str,
        loader: Loader,
        bpe: OnceCell<Result<CoreBPE, String>>,
    }

    impl TiktokenEncoder {
        pub fn cl100k_base() -> Self {
            Self::new("cl100k_base", tiktoken_rs::cl100k_base)
        }

        pub fn o200k_base() -> Self {
            Self::new("o200k_base", tiktoken_rs::o200k_base)
        }

        fn new(name: &'static str, loader: Loader) -> Self {
            Self {
                name,
                loader,
                bpe: OnceCell::new(),
            }
        }
    }

    impl SubwordEncoder for TiktokenEncoder {
        fn encode_len(&self, text: &str) -> Result<usize, TokenizeError> {
            let loaded = self
                .bpe
                .get_or_init(|| (self.loader)().map_err(|e| e.to_string()));
            match loaded {
                Ok(bpe) => Ok(bpe.encode_with_special_tokens(text).len()),
                Err(message) => Err(TokenizeError::Encode {
                    encoder: self.name,
                    message: message.clone(),
                }),
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }
}
