//! Environment-driven settings, loaded once at startup.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MEDASSIST_BASE_URL` | `http://localhost:8553/v1/openai` |
//! | `MEDASSIST_API_KEY` | `dpais`; set empty to send no auth header |
//! | `MEDASSIST_MODEL` | `qwen2.5` |
//! | `MEDASSIST_STT_MODEL` | `whisper` |
//! | `MEDASSIST_HTTP_TIMEOUT_SECS` | `120` |
//! | `MEDASSIST_LEDGER_PATH` | `cost_log.json` |
//! | `MEDASSIST_RATE_FILE` | unset (YAML rate overlay) |
//! | `MEDASSIST_INPUT_COST_PER_1K` | local model rate override |
//! | `MEDASSIST_OUTPUT_COST_PER_1K` | local model rate override |
//! | `MEDASSIST_AUDIO_COST_PER_MINUTE` | per-minute rate on the chat and speech models |
//! | `MEDASSIST_COMMERCIAL_MODELS` | `gpt-4o,gpt-4o-mini,claude-3-5-sonnet` |

use crate::inference::{OpenAiCompatBackend, DEFAULT_BASE_URL};
use crate::ledger::{CostLedger, FileLedgerStore};
use crate::stt::SttClient;
use crate::tokens::{CommercialRateTable, ModelRate, RateTable};
use crate::types::ModelId;
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_KEY: &str = "dpais";
const DEFAULT_MODEL: &str = "qwen2.5";
const DEFAULT_STT_MODEL: &str = "whisper";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LEDGER_PATH: &str = "cost_log.json";
const DEFAULT_COMMERCIAL_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet"];

/// Contents of the optional YAML rate file.
#[derive(Debug, Default, Deserialize)]
pub struct RateFile {
    /// The `models:` section.
    #[serde(flatten)]
    pub rates: RateTable,
    #[serde(default)]
    pub commercial: Option<CommercialRateTable>,
}

impl RateFile {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read rate file: {}", e),
                ErrorContext::new()
                    .with_field_path("MEDASSIST_RATE_FILE")
                    .with_details(path.display().to_string()),
            )
        })?;
        Self::from_yaml(&content).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid rate file: {}", e),
                ErrorContext::new()
                    .with_field_path("MEDASSIST_RATE_FILE")
                    .with_details(path.display().to_string()),
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: ModelId,
    pub stt_model: ModelId,
    pub http_timeout: Duration,
    pub ledger_path: PathBuf,
    pub rates: RateTable,
    pub commercial_rates: CommercialRateTable,
    pub commercial_models: Vec<ModelId>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; blank values count as unset,
    /// except `MEDASSIST_API_KEY` where blank means no authentication.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get("MEDASSIST_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("MEDASSIST_BASE_URL")
                    .with_details(base_url.clone()),
            )
        })?;

        let api_key = match lookup("MEDASSIST_API_KEY") {
            None => Some(DEFAULT_API_KEY.to_string()),
            Some(v) => Some(v.trim().to_string()).filter(|v| !v.is_empty()),
        };
        let model = ModelId::new(get("MEDASSIST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()));
        let stt_model =
            ModelId::new(get("MEDASSIST_STT_MODEL").unwrap_or_else(|| DEFAULT_STT_MODEL.into()));

        let timeout_secs = parse_var::<u64>(
            "MEDASSIST_HTTP_TIMEOUT_SECS",
            get("MEDASSIST_HTTP_TIMEOUT_SECS"),
        )?
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::configuration_with_context(
                "timeout must be positive",
                ErrorContext::new().with_field_path("MEDASSIST_HTTP_TIMEOUT_SECS"),
            ));
        }

        let ledger_path = PathBuf::from(
            get("MEDASSIST_LEDGER_PATH").unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string()),
        );

        let mut rates = RateTable::local_defaults();
        let mut commercial_rates = CommercialRateTable::reference_defaults();
        if let Some(path) = get("MEDASSIST_RATE_FILE") {
            let file = RateFile::load(Path::new(&path))?;
            debug!(path = %path, models = file.rates.len(), "loaded rate file");
            rates.merge(file.rates);
            if let Some(commercial) = file.commercial {
                commercial_rates.merge(commercial);
            }
        }

        // Env overrides apply to the configured local models on top of the file.
        let input =
            parse_var::<f64>("MEDASSIST_INPUT_COST_PER_1K", get("MEDASSIST_INPUT_COST_PER_1K"))?;
        let output =
            parse_var::<f64>("MEDASSIST_OUTPUT_COST_PER_1K", get("MEDASSIST_OUTPUT_COST_PER_1K"))?;
        if input.is_some() || output.is_some() {
            let mut rate = rates.get(&model).copied().unwrap_or_default();
            if let Some(v) = input {
                rate.cost_per_1k_input_tokens = v;
            }
            if let Some(v) = output {
                rate.cost_per_1k_output_tokens = v;
            }
            rates.insert(model.clone(), rate);
        }
        if let Some(per_minute) = parse_var::<f64>(
            "MEDASSIST_AUDIO_COST_PER_MINUTE",
            get("MEDASSIST_AUDIO_COST_PER_MINUTE"),
        )? {
            // Audio is billed on the model that produced the request.
            for target in [&model, &stt_model] {
                let rate = rates
                    .get(target)
                    .copied()
                    .unwrap_or_else(|| ModelRate::new(0.0, 0.0));
                rates.insert(target.clone(), rate.with_cost_per_minute(per_minute));
            }
        }

        rates.validate()?;
        commercial_rates.validate()?;

        let commercial_models = match get("MEDASSIST_COMMERCIAL_MODELS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ModelId::new)
                .collect(),
            None => DEFAULT_COMMERCIAL_MODELS.iter().map(|m| ModelId::new(m)).collect(),
        };

        Ok(Self {
            base_url,
            api_key,
            model,
            stt_model,
            http_timeout: Duration::from_secs(timeout_secs),
            ledger_path,
            rates,
            commercial_rates,
            commercial_models,
        })
    }

    pub fn inference_backend(&self) -> Result<OpenAiCompatBackend> {
        let mut builder = OpenAiCompatBackend::builder()
            .base_url(&self.base_url)
            .timeout(self.http_timeout);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    pub fn stt_client(&self) -> Result<SttClient> {
        let mut builder = SttClient::builder()
            .base_url(&self.base_url)
            .model(self.stt_model.as_str())
            .timeout(self.http_timeout);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    pub fn ledger(&self) -> CostLedger {
        CostLedger::new(Arc::new(FileLedgerStore::new(&self.ledger_path)))
    }
}

fn parse_var<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                Error::configuration_with_context(
                    format!("cannot parse value: {}", e),
                    ErrorContext::new().with_field_path(key).with_details(raw.clone()),
                )
            })
        })
        .transpose()
}
