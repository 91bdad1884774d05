use async_trait::async_trait;
use chrono::Utc;
use exam_core::model::{ExamState, ExamStateKey};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{ExamStateRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl ExamStateRepository for SqliteRepository {
    async fn get_state(&self, key: &ExamStateKey) -> Result<Option<ExamState>, StorageError> {
        let row = sqlx::query("SELECT payload FROM exam_states WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;
        Ok(Some(ExamState::from_json(&payload)?))
    }

    async fn set_state(&self, key: &ExamStateKey, state: &ExamState) -> Result<(), StorageError> {
        let payload = state.to_json().map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO exam_states (key, payload, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_state(&self, key: &ExamStateKey) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_states WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
