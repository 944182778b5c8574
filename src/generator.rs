//! Response generator: one inference call plus token and cost accounting.

use crate::config::Settings;
use crate::inference::InferenceBackend;
use crate::ledger::{CostLedger, MemoryLedgerStore};
use crate::render::markdown_to_html;
use crate::tokens::{
    CommercialCost, CommercialRateTable, CostBreakdown, RateTable, TokenEstimator, TokenUsage,
};
use crate::types::{Message, ModelId};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Everything a caller gets back from one generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Raw markdown from the model.
    pub content: String,
    /// `content` rendered to HTML.
    pub content_html: String,
    pub token_usage: TokenUsage,
    pub cost_data: CostBreakdown,
    /// Keyed by the requested reference model.
    pub commercial_costs: BTreeMap<String, CommercialCost>,
    /// Ledger total after this request was recorded.
    pub cumulative_cost: f64,
}

/// Service object composing the inference backend, estimator, rate tables and ledger.
pub struct ResponseGenerator {
    backend: Arc<dyn InferenceBackend>,
    model: ModelId,
    estimator: TokenEstimator,
    rates: RateTable,
    commercial_rates: CommercialRateTable,
    commercial_models: Vec<ModelId>,
    ledger: Arc<CostLedger>,
}

impl ResponseGenerator {
    pub fn builder(backend: Arc<dyn InferenceBackend>) -> ResponseGeneratorBuilder {
        ResponseGeneratorBuilder::new(backend)
    }

    /// Generator wired from settings: HTTP backend and file ledger.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = Arc::new(settings.inference_backend()?);
        Ok(Self::builder(backend)
            .model(settings.model.clone())
            .rates(settings.rates.clone())
            .commercial_rates(settings.commercial_rates.clone())
            .commercial_models(settings.commercial_models.clone())
            .ledger(Arc::new(settings.ledger()))
            .build())
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Run one completion and account for it.
    ///
    /// Only [`Error::Inference`] is returned; tokenizer and ledger problems are
    /// absorbed. The ledger is untouched when the backend fails.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        audio_minutes: Option<f64>,
    ) -> Result<GenerationResult> {
        let request_id = Uuid::new_v4().to_string();
        let start = std::time::Instant::now();
        let messages = [Message::system(system_prompt), Message::user(user_input)];

        let content = self
            .backend
            .complete(self.model.as_str(), &messages)
            .await
            .map_err(|e| {
                info!(
                    request_id = request_id.as_str(),
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis(),
                    error = %e,
                    "generation failed"
                );
                match e {
                    e @ Error::Inference { .. } => e,
                    other => Error::inference(other.to_string()),
                }
            })?;

        let prompt = format!("{}{}", system_prompt, user_input);
        let usage = TokenUsage::new(
            self.estimator.estimate(&prompt, &self.model),
            self.estimator.estimate(&content, &self.model),
        );
        let cost_data = self.rates.calculate_cost(
            &self.model,
            usage.input_tokens,
            usage.output_tokens,
            audio_minutes,
        );
        let commercial_costs = self
            .commercial_models
            .iter()
            .map(|m| {
                (
                    m.to_string(),
                    self.commercial_rates.calculate(usage.total_tokens, m),
                )
            })
            .collect();

        let state = self
            .ledger
            .record(cost_data.request_cost, usage.total_tokens)
            .await;

        info!(
            request_id = request_id.as_str(),
            model = %self.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            request_cost = cost_data.request_cost,
            cumulative_cost = state.total_cost,
            duration_ms = start.elapsed().as_millis(),
            "generation completed"
        );

        Ok(GenerationResult {
            content_html: markdown_to_html(&content),
            content,
            token_usage: usage,
            cost_data,
            commercial_costs,
            cumulative_cost: state.total_cost,
        })
    }
}

pub struct ResponseGeneratorBuilder {
    backend: Arc<dyn InferenceBackend>,
    model: ModelId,
    estimator: Option<TokenEstimator>,
    rates: RateTable,
    commercial_rates: CommercialRateTable,
    commercial_models: Vec<ModelId>,
    ledger: Option<Arc<CostLedger>>,
}

impl ResponseGeneratorBuilder {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            model: ModelId::new("qwen2.5"),
            estimator: None,
            rates: RateTable::local_defaults(),
            commercial_rates: CommercialRateTable::reference_defaults(),
            commercial_models: ["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet"]
                .iter()
                .map(|m| ModelId::new(m))
                .collect(),
            ledger: None,
        }
    }

    pub fn model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = model.into();
        self
    }

    pub fn estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn commercial_rates(mut self, rates: CommercialRateTable) -> Self {
        self.commercial_rates = rates;
        self
    }

    pub fn commercial_models(mut self, models: Vec<ModelId>) -> Self {
        self.commercial_models = models;
        self
    }

    pub fn ledger(mut self, ledger: Arc<CostLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Without an explicit ledger the generator keeps totals in memory only.
    pub fn build(self) -> ResponseGenerator {
        ResponseGenerator {
            backend: self.backend,
            model: self.model,
            estimator: self.estimator.unwrap_or_default(),
            rates: self.rates,
            commercial_rates: self.commercial_rates,
            commercial_models: self.commercial_models,
            ledger: self
                .ledger
                .unwrap_or_else(|| Arc::new(CostLedger::new(Arc::new(MemoryLedgerStore::new())))),
        }
    }
}
