//! Model rates and per-request cost breakdowns.

use crate::types::ModelId;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Round a monetary value to 6 decimal places.
pub fn round_cost(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Rates for one model. Self-hosted models legitimately use all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelRate {
    pub cost_per_1k_input_tokens: f64,
    pub cost_per_1k_output_tokens: f64,
    /// Audio models only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_minute: Option<f64>,
}

impl ModelRate {
    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            cost_per_1k_input_tokens: input_per_1k,
            cost_per_1k_output_tokens: output_per_1k,
            cost_per_minute: None,
        }
    }

    pub fn with_cost_per_minute(mut self, per_minute: f64) -> Self {
        self.cost_per_minute = Some(per_minute);
        self
    }

    /// Reject negative or non-finite rates; a negative rate would let the
    /// cumulative ledger total decrease.
    pub fn validate(&self, model: &ModelId) -> Result<()> {
        let fields = [
            ("cost_per_1k_input_tokens", Some(self.cost_per_1k_input_tokens)),
            ("cost_per_1k_output_tokens", Some(self.cost_per_1k_output_tokens)),
            ("cost_per_minute", self.cost_per_minute),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::configuration_with_context(
                        "rates must be finite and non-negative",
                        ErrorContext::new()
                            .with_field_path(format!("{}.{}", model, name))
                            .with_details(v.to_string()),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Cost of a single request against the local rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub input_cost: f64,
    pub output_cost: f64,
    pub audio_cost: f64,
    pub request_cost: f64,
    pub currency: String,
}

impl CostBreakdown {
    /// All-zero breakdown, used for models without a rate entry.
    pub fn zero(model: &ModelId, input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost: 0.0,
            output_cost: 0.0,
            audio_cost: 0.0,
            request_cost: 0.0,
            currency: "USD".into(),
        }
    }

    pub fn format(&self) -> String {
        format!("{} {:.6}", self.currency, self.request_cost)
    }
}

/// Per-model rate table, fixed after startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    models: HashMap<ModelId, ModelRate>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local inference defaults: the chat model and the speech model, both free.
    pub fn local_defaults() -> Self {
        Self::new()
            .with_rate("qwen2.5", ModelRate::new(0.0, 0.0))
            .with_rate("whisper", ModelRate::new(0.0, 0.0).with_cost_per_minute(0.0))
    }

    pub fn with_rate(mut self, model: impl Into<ModelId>, rate: ModelRate) -> Self {
        self.insert(model, rate);
        self
    }

    pub fn insert(&mut self, model: impl Into<ModelId>, rate: ModelRate) {
        self.models.insert(model.into(), rate);
    }

    pub fn get(&self, model: &ModelId) -> Option<&ModelRate> {
        self.models.get(model)
    }

    /// Overlay `other` on top of this table, replacing shared entries.
    pub fn merge(&mut self, other: RateTable) {
        self.models.extend(other.models);
    }

    pub fn validate(&self) -> Result<()> {
        for (model, rate) in &self.models {
            rate.validate(model)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Cost of one request. Unknown models cost nothing.
    pub fn calculate_cost(
        &self,
        model: &ModelId,
        input_tokens: usize,
        output_tokens: usize,
        audio_minutes: Option<f64>,
    ) -> CostBreakdown {
        let Some(rate) = self.get(model) else {
            debug!(model = %model, "no rate entry; request costs nothing");
            return CostBreakdown::zero(model, input_tokens, output_tokens);
        };

        let input_cost = input_tokens as f64 / 1000.0 * rate.cost_per_1k_input_tokens;
        let output_cost = output_tokens as f64 / 1000.0 * rate.cost_per_1k_output_tokens;
        let minutes = audio_minutes.filter(|m| m.is_finite() && *m > 0.0);
        let audio_cost = match (minutes, rate.cost_per_minute) {
            (Some(m), Some(per_minute)) => m * per_minute,
            _ => 0.0,
        };

        CostBreakdown {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost: round_cost(input_cost),
            output_cost: round_cost(output_cost),
            audio_cost: round_cost(audio_cost),
            request_cost: round_cost(input_cost + output_cost + audio_cost),
            currency: "USD".into(),
        }
    }
}
