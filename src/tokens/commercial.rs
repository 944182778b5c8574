//! Reference prices of hosted commercial models, for side-by-side display only.

use super::pricing::round_cost;
use crate::types::ModelId;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Blended price per 1k tokens (input and output alike).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommercialRate {
    pub cost_per_1k_tokens: f64,
}

impl CommercialRate {
    pub fn per_1k(cost: f64) -> Self {
        Self {
            cost_per_1k_tokens: cost,
        }
    }
}

/// What a token count would have cost on a commercial model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialCost {
    pub model: String,
    pub total_cost: f64,
    /// Cost per 1k tokens used for the calculation.
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
struct RawCommercialTable {
    default_model: ModelId,
    #[serde(default)]
    models: HashMap<ModelId, CommercialRate>,
}

/// Commercial reference prices. The default reference model is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommercialRateTable {
    default_model: ModelId,
    models: HashMap<ModelId, CommercialRate>,
}

impl CommercialRateTable {
    pub fn new(default_model: impl Into<ModelId>, default_rate: CommercialRate) -> Self {
        let default_model = default_model.into();
        let mut models = HashMap::new();
        models.insert(default_model.clone(), default_rate);
        Self {
            default_model,
            models,
        }
    }

    /// Published list prices, blended per 1k tokens.
    pub fn reference_defaults() -> Self {
        Self::new("gpt-4o", CommercialRate::per_1k(0.005))
            .with_rate("gpt-4o-mini", CommercialRate::per_1k(0.00015))
            .with_rate("gpt-4", CommercialRate::per_1k(0.03))
            .with_rate("gpt-3.5-turbo", CommercialRate::per_1k(0.0015))
            .with_rate("claude-3-5-sonnet", CommercialRate::per_1k(0.003))
            .with_rate("claude-3-haiku", CommercialRate::per_1k(0.00025))
    }

    pub fn with_rate(mut self, model: impl Into<ModelId>, rate: CommercialRate) -> Self {
        self.models.insert(model.into(), rate);
        self
    }

    pub fn default_model(&self) -> &ModelId {
        &self.default_model
    }

    pub fn get(&self, model: &ModelId) -> Option<&CommercialRate> {
        self.models.get(model)
    }

    /// Overlay `other`; its default model replaces ours.
    pub fn merge(&mut self, other: CommercialRateTable) {
        self.models.extend(other.models);
        self.default_model = other.default_model;
    }

    pub fn validate(&self) -> Result<()> {
        for (model, rate) in &self.models {
            let v = rate.cost_per_1k_tokens;
            if !v.is_finite() || v < 0.0 {
                return Err(Error::configuration_with_context(
                    "commercial rates must be finite and non-negative",
                    ErrorContext::new()
                        .with_field_path(format!("commercial.{}", model))
                        .with_details(v.to_string()),
                ));
            }
        }
        Ok(())
    }

    /// Cost of `tokens` on `reference_model`, or on the default reference
    /// model when that one is not listed.
    pub fn calculate(&self, tokens: usize, reference_model: &ModelId) -> CommercialCost {
        let (model, rate) = match self.models.get(reference_model) {
            Some(rate) => (reference_model, rate),
            None => (&self.default_model, self.default_rate()),
        };
        CommercialCost {
            model: model.to_string(),
            total_cost: round_cost(tokens as f64 / 1000.0 * rate.cost_per_1k_tokens),
            rate: rate.cost_per_1k_tokens,
        }
    }

    fn default_rate(&self) -> &CommercialRate {
        const FREE: CommercialRate = CommercialRate {
            cost_per_1k_tokens: 0.0,
        };
        self.models.get(&self.default_model).unwrap_or(&FREE)
    }
}

impl<'de> Deserialize<'de> for CommercialRateTable {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = RawCommercialTable::deserialize(deserializer)?;
        if !raw.models.contains_key(&raw.default_model) {
            return Err(serde::de::Error::custom(format!(
                "default_model '{}' has no rate entry",
                raw.default_model
            )));
        }
        Ok(Self {
            default_model: raw.default_model,
            models: raw.models,
        })
    }
}
