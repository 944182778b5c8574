//! # Cumulative Cost Ledger
//!
//! A persisted running total of cost, tokens and requests across every
//! generation since the ledger was last reset.
//!
//! Ledger I/O never fails a request: an absent or unreadable record loads as
//! a zero-valued state, and a failed save is logged and reported as `false`.
//! [`CostLedger::record`] holds an async mutex across its read-modify-write.
//! The mutex is shared by every ledger in the process over the same
//! [`LedgerStore::lock_key`], so concurrent requests never lose an update even
//! when they go through separately constructed ledgers.

mod store;

pub use store::{FileLedgerStore, LedgerStore, MemoryLedgerStore};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type UpdateLock = Arc<Mutex<()>>;

static SHARED_LOCKS: Lazy<std::sync::Mutex<HashMap<PathBuf, UpdateLock>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

/// Process-wide update lock for the record at `key`.
fn shared_lock(key: &Path) -> UpdateLock {
    let mut locks = SHARED_LOCKS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks
        .entry(key.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// The persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub last_updated: DateTime<Utc>,
}

impl LedgerState {
    pub fn zero() -> Self {
        Self {
            total_cost: 0.0,
            total_tokens: 0,
            total_requests: 0,
            last_updated: Utc::now(),
        }
    }

    /// Add one request's cost and tokens.
    pub fn apply(&mut self, request_cost: f64, tokens: usize) {
        self.total_cost += request_cost;
        self.total_tokens = self.total_tokens.saturating_add(tokens as u64);
        self.total_requests = self.total_requests.saturating_add(1);
        self.last_updated = Utc::now();
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Ledger service over an injected [`LedgerStore`].
pub struct CostLedger {
    store: Arc<dyn LedgerStore>,
    update_lock: UpdateLock,
}

impl CostLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        let update_lock = match store.lock_key() {
            Some(key) => shared_lock(&key),
            None => Arc::new(Mutex::new(())),
        };
        Self { store, update_lock }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Current state; zero-valued when the record is absent or unreadable.
    pub async fn load(&self) -> LedgerState {
        let bytes = match self.store.read().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(store = self.store.name(), "no ledger record yet; starting from zero");
                return LedgerState::zero();
            }
            Err(e) => {
                warn!(
                    store = self.store.name(),
                    error = %e,
                    "ledger unreadable; starting from zero"
                );
                return LedgerState::zero();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    store = self.store.name(),
                    error = %e,
                    "ledger record corrupt; starting from zero"
                );
                LedgerState::zero()
            }
        }
    }

    /// Persist `state`. Returns `false` (after logging) when the write failed.
    pub async fn save(&self, state: &LedgerState) -> bool {
        let bytes = match serde_json::to_vec_pretty(state) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize ledger");
                return false;
            }
        };
        match self.store.write(&bytes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "failed to save ledger");
                false
            }
        }
    }

    /// Add one request to the running totals and persist them.
    /// Returns the updated state even when the save failed.
    pub async fn record(&self, request_cost: f64, tokens: usize) -> LedgerState {
        let _guard = self.update_lock.lock().await;
        let mut state = self.load().await;
        state.apply(request_cost, tokens);
        self.save(&state).await;
        state
    }

    /// Start a fresh ledger.
    pub async fn reset(&self) -> LedgerState {
        let _guard = self.update_lock.lock().await;
        let state = LedgerState::zero();
        self.save(&state).await;
        state
    }
}
