use async_trait::async_trait;
use chrono::NaiveDate;
use quiz_core::model::TestResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Name of the record holding the serialized result history.
pub const HISTORY_KEY: &str = "drive_test_results";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a `TestResult`.
///
/// Field names follow the history record format so logs written by older
/// builds keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultRecord {
    pub date: NaiveDate,
    pub score: u32,
    pub total: u32,
    pub passed: bool,
    pub time_taken: u32,
}

impl TestResultRecord {
    #[must_use]
    pub fn from_result(result: &TestResult) -> Self {
        Self {
            date: result.date(),
            score: result.score(),
            total: result.total(),
            passed: result.passed(),
            time_taken: result.time_taken_secs(),
        }
    }

    /// Convert the record back into a domain `TestResult`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record breaks a result invariant.
    pub fn into_result(self) -> Result<TestResult, StorageError> {
        TestResult::new(
            self.date,
            self.score,
            self.total,
            self.passed,
            self.time_taken,
        )
        .map_err(|err| StorageError::Serialization(err.to_string()))
    }
}

/// Serialize a history, newest first, into the record format.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_history(results: &[TestResult]) -> Result<String, StorageError> {
    let records: Vec<_> = results.iter().map(TestResultRecord::from_result).collect();
    serde_json::to_string(&records).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Parse a history record.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON or invalid entries.
pub fn decode_history(raw: &str) -> Result<Vec<TestResult>, StorageError> {
    let records: Vec<TestResultRecord> =
        serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;
    records
        .into_iter()
        .map(TestResultRecord::into_result)
        .collect()
}

/// Repository contract for the result history record.
///
/// The whole history is read and written as one unit.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Read the stored history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or parsed.
    /// A missing record is an empty history, not an error.
    async fn load_history(&self) -> Result<Vec<TestResult>, StorageError>;

    /// Replace the stored history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_history(&self, results: &[TestResult]) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Keeps the encoded record rather than the values so parsing is exercised
/// the same way as with a real backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    raw: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with an arbitrary (possibly corrupt) record.
    #[must_use]
    pub fn with_raw_history(raw: impl Into<String>) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.into()))),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent writes fail with `StorageError::Connection`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The record as currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw_history(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .raw
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn load_history(&self) -> Result<Vec<TestResult>, StorageError> {
        match self.raw_history()? {
            Some(raw) => decode_history(&raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save_history(&self, results: &[TestResult]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("writes disabled".into()));
        }
        let encoded = encode_history(results)?;
        let mut guard = self
            .raw
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(encoded);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let history: Arc<dyn HistoryRepository> = Arc::new(InMemoryRepository::new());
        Self { history }
    }
}
