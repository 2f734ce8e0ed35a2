use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progress_core::ReportSnapshot;
use progress_core::model::CollectionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by cache adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("cache lock poisoned: {0}")]
    Poisoned(String),
}

/// Outcome of the most recent aggregation run that had no earlier good data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// What the cache holds for a collection.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Ready(Arc<ReportSnapshot>),
    Failed(FailureRecord),
}

/// Per-collection report cache.
///
/// A `Ready` entry is never replaced by a failure: a failed refresh leaves the
/// last good snapshot readable until it is invalidated.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Fetch the cached entry for a collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read.
    async fn get_entry(&self, collection: &CollectionId)
    -> Result<Option<CacheEntry>, StorageError>;

    /// Store a finished snapshot, replacing whatever was cached.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn store_ready(&self, snapshot: Arc<ReportSnapshot>) -> Result<(), StorageError>;

    /// Record a failed run. Ignored when a `Ready` snapshot is present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn store_failure(
        &self,
        collection: &CollectionId,
        failure: FailureRecord,
    ) -> Result<(), StorageError>;

    /// Drop the entry for a collection. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn invalidate(&self, collection: &CollectionId) -> Result<bool, StorageError>;
}

/// Process-lifetime cache backed by a mutex-guarded map.
#[derive(Clone, Default)]
pub struct InMemoryReportRepository {
    entries: Arc<Mutex<HashMap<CollectionId, CacheEntry>>>,
}

impl InMemoryReportRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn get_entry(
        &self,
        collection: &CollectionId,
    ) -> Result<Option<CacheEntry>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(guard.get(collection).cloned())
    }

    async fn store_ready(&self, snapshot: Arc<ReportSnapshot>) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        guard.insert(snapshot.collection().clone(), CacheEntry::Ready(snapshot));
        Ok(())
    }

    async fn store_failure(
        &self,
        collection: &CollectionId,
        failure: FailureRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        if !matches!(guard.get(collection), Some(CacheEntry::Ready(_))) {
            guard.insert(collection.clone(), CacheEntry::Failed(failure));
        }
        Ok(())
    }

    async fn invalidate(&self, collection: &CollectionId) -> Result<bool, StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(guard.remove(collection).is_some())
    }
}
