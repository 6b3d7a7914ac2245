use std::sync::Arc;

use tokio::sync::Mutex;

use quiz_core::model::{HistoryStats, TestResult};
use storage::repository::{HistoryRepository, InMemoryRepository};

use crate::error::PersistenceError;

/// Newest-first log of finished exams, backed by a `HistoryRepository`.
///
/// The in-memory list is authoritative for the running process: a failed
/// write is reported but never rolls it back. Appends are serialized by the
/// internal lock, so concurrent sessions cannot interleave rewrites.
#[derive(Clone)]
pub struct ResultStore {
    repo: Arc<dyn HistoryRepository>,
    results: Arc<Mutex<Vec<TestResult>>>,
}

impl ResultStore {
    #[must_use]
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self {
            repo,
            results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Read the persisted log into memory and return it.
    ///
    /// A missing or unreadable log is treated as an empty history.
    pub async fn load(&self) -> Vec<TestResult> {
        let loaded = match self.try_load().await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(error = %err, "starting with empty result history");
                Vec::new()
            }
        };
        let mut guard = self.results.lock().await;
        guard.clone_from(&loaded);
        loaded
    }

    /// Read the persisted log without touching the in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Read` if the record cannot be read or parsed.
    pub async fn try_load(&self) -> Result<Vec<TestResult>, PersistenceError> {
        self.repo
            .load_history()
            .await
            .map_err(PersistenceError::Read)
    }

    /// Prepend `result` and persist the whole log.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` if persisting fails; the result stays
    /// in the in-memory log regardless.
    pub async fn append(&self, result: TestResult) -> Result<(), PersistenceError> {
        let mut guard = self.results.lock().await;
        guard.insert(0, result);
        self.persist(&guard).await
    }

    /// Empty the log and persist the empty state.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` if persisting fails.
    pub async fn clear(&self) -> Result<(), PersistenceError> {
        let mut guard = self.results.lock().await;
        guard.clear();
        self.persist(&guard).await
    }

    /// Snapshot of the in-memory log, newest first.
    pub async fn results(&self) -> Vec<TestResult> {
        self.results.lock().await.clone()
    }

    pub async fn latest(&self) -> Option<TestResult> {
        self.results.lock().await.first().cloned()
    }

    pub async fn stats(&self) -> HistoryStats {
        HistoryStats::from_results(&self.results.lock().await)
    }

    async fn persist(&self, results: &[TestResult]) -> Result<(), PersistenceError> {
        self.repo.save_history(results).await.map_err(|err| {
            tracing::warn!(error = %err, len = results.len(), "failed to persist result history");
            PersistenceError::Write(err)
        })
    }
}
