use async_trait::async_trait;
use playtrack_core::model::ReportPayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append-only list of submitted payloads, grouped by storage key.
///
/// Entries are kept oldest first. Nothing here replays them; the list exists so
/// payloads survive when no delivery channel accepted them.
#[async_trait]
pub trait BacklogRepository: Send + Sync {
    /// Append a payload under `key`, then drop the oldest entries so that at most
    /// `limit` remain (a limit of zero is treated as one). Returns the number of
    /// entries under `key` afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be encoded or stored.
    async fn append_pending(
        &self,
        key: &str,
        payload: &ReportPayload,
        limit: Option<usize>,
    ) -> Result<usize, StorageError>;

    /// List payloads under `key`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if stored entries cannot be read or decoded.
    async fn list_pending(&self, key: &str) -> Result<Vec<ReportPayload>, StorageError>;

    /// Remove every payload under `key`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entries cannot be removed.
    async fn clear_pending(&self, key: &str) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Payloads are kept as JSON text, the same form the `SQLite` backend stores.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    backlog: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backlog: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl BacklogRepository for InMemoryRepository {
    async fn append_pending(
        &self,
        key: &str,
        payload: &ReportPayload,
        limit: Option<usize>,
    ) -> Result<usize, StorageError> {
        let encoded = encode_payload(payload)?;
        let mut guard = self
            .backlog
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let entries = guard.entry(key.to_owned()).or_default();
        entries.push(encoded);
        if let Some(limit) = limit {
            let keep = limit.max(1);
            if entries.len() > keep {
                let excess = entries.len() - keep;
                entries.drain(..excess);
            }
        }
        Ok(entries.len())
    }

    async fn list_pending(&self, key: &str) -> Result<Vec<ReportPayload>, StorageError> {
        let guard = self
            .backlog
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(key)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|raw| decode_payload(raw))
            .collect()
    }

    async fn clear_pending(&self, key: &str) -> Result<u64, StorageError> {
        let mut guard = self
            .backlog
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = guard.remove(key).map_or(0, |entries| entries.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

pub(crate) fn encode_payload(payload: &ReportPayload) -> Result<String, StorageError> {
    serde_json::to_string(payload).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub(crate) fn decode_payload(raw: &str) -> Result<ReportPayload, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub backlog: Arc<dyn BacklogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let backlog: Arc<dyn BacklogRepository> = Arc::new(InMemoryRepository::new());
        Self { backlog }
    }
}
