use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use quiz_core::model::TestResult;

use crate::repository::{
    HISTORY_KEY, HistoryRepository, StorageError, decode_history, encode_history,
};

use super::SqliteRepository;

#[async_trait]
impl HistoryRepository for SqliteRepository {
    async fn load_history(&self) -> Result<Vec<TestResult>, StorageError> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ?1")
            .bind(HISTORY_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(Vec::new());
        };

        let raw: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        decode_history(&raw)
    }

    async fn save_history(&self, results: &[TestResult]) -> Result<(), StorageError> {
        let encoded = encode_history(results)?;
        self.put_raw_history(&encoded).await
    }
}

impl SqliteRepository {
    /// Overwrite the history record with raw text, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the write fails.
    pub async fn put_raw_history(&self, raw: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO records (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(HISTORY_KEY)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
