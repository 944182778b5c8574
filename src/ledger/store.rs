//! Ledger store backends.

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Single-record durable store. `read` returns `None` when nothing was ever written.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn read(&self) -> Result<Option<Vec<u8>>>;
    async fn write(&self, record: &[u8]) -> Result<()>;
    fn name(&self) -> &'static str;

    /// Identity of the underlying record. Ledgers over stores with the same
    /// key share one update lock; `None` means the store is private.
    fn lock_key(&self) -> Option<PathBuf> {
        None
    }
}

/// JSON file on disk. Each write goes to a uniquely named sibling temp file
/// that is renamed into place, so a reader never observes a half-written record.
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    /// Absolute form of the path, so `a.json` and `./a.json` share a lock.
    fn absolute_path(&self) -> PathBuf {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.path))
                .unwrap_or_else(|_| self.path.clone())
        };
        absolute
            .components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> Error {
        Error::ledger_with_context(
            format!("failed to {} ledger: {}", action, e),
            ErrorContext::new()
                .with_field_path(self.path.display().to_string())
                .with_source("file_ledger_store"),
        )
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    async fn write(&self, record: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directory for", e))?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, record)
            .await
            .map_err(|e| self.io_error("write", e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error("replace", e));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }

    fn lock_key(&self) -> Option<PathBuf> {
        Some(self.absolute_path())
    }
}

/// In-process store for tests and runs that should not persist.
#[derive(Default)]
pub struct MemoryLedgerStore {
    record: RwLock<Option<Vec<u8>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw bytes, e.g. a corrupted record.
    pub fn with_record(record: impl Into<Vec<u8>>) -> Self {
        Self {
            record: RwLock::new(Some(record.into())),
        }
    }

    fn poisoned() -> Error {
        Error::ledger_with_context(
            "memory ledger lock poisoned",
            ErrorContext::new().with_source("memory_ledger_store"),
        )
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        let guard = self.record.read().map_err(|_| Self::poisoned())?;
        Ok(guard.clone())
    }

    async fn write(&self, record: &[u8]) -> Result<()> {
        let mut guard = self.record.write().map_err(|_| Self::poisoned())?;
        *guard = Some(record.to_vec());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
