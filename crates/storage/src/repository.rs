use async_trait::async_trait;
use exam_core::model::{ExamState, ExamStateError, ExamStateKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored record exists but is not a recognised exam state.
    #[error("corrupt exam state: {0}")]
    Corrupt(#[from] ExamStateError),
}

/// Durable key-value store for in-progress exam state.
///
/// Exactly one controller writes a given key; the record is read once when
/// the exam page loads.
#[async_trait]
pub trait ExamStateRepository: Send + Sync {
    /// Fetch the saved state for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if a record exists but cannot be decoded,
    /// or other storage errors.
    async fn get_state(&self, key: &ExamStateKey) -> Result<Option<ExamState>, StorageError>;

    /// Persist or replace the state for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be stored.
    async fn set_state(&self, key: &ExamStateKey, state: &ExamState) -> Result<(), StorageError>;

    /// Remove the state for `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete cannot be performed.
    async fn delete_state(&self, key: &ExamStateKey) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Records are kept in their serialized form so decoding behaves exactly like
/// the durable backends.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    states: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Store a raw payload, bypassing encoding. Useful for seeding legacy or
    /// damaged records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(&self, key: &ExamStateKey, payload: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.as_str().to_owned(), payload.into());
        Ok(())
    }

    /// Raw payload stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw(&self, key: &ExamStateKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key.as_str()).cloned())
    }
}

#[async_trait]
impl ExamStateRepository for InMemoryRepository {
    async fn get_state(&self, key: &ExamStateKey) -> Result<Option<ExamState>, StorageError> {
        let Some(raw) = self.raw(key)? else {
            return Ok(None);
        };
        Ok(Some(ExamState::from_json(&raw)?))
    }

    async fn set_state(&self, key: &ExamStateKey, state: &ExamState) -> Result<(), StorageError> {
        let payload = state
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.insert_raw(key, payload)
    }

    async fn delete_state(&self, key: &ExamStateKey) -> Result<(), StorageError> {
        let mut guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key.as_str());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exam_states: Arc<dyn ExamStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let exam_states: Arc<dyn ExamStateRepository> = Arc::new(InMemoryRepository::new());
        Self { exam_states }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerMap, CandidateId, QuestionId, SchemeId};

    fn key() -> ExamStateKey {
        ExamStateKey::for_exam(&CandidateId::new("c1"), &SchemeId::new("ADS"))
    }

    #[tokio::test]
    async fn round_trips_and_deletes_state() {
        let repo = InMemoryRepository::new();
        let mut answers = AnswerMap::new();
        answers.set(QuestionId::new("Q1"), "x");
        let state = ExamState::new(answers, 600);

        repo.set_state(&key(), &state).await.unwrap();
        assert_eq!(repo.get_state(&key()).await.unwrap(), Some(state));

        repo.delete_state(&key()).await.unwrap();
        assert_eq!(repo.get_state(&key()).await.unwrap(), None);
        // deleting twice is fine
        repo.delete_state(&key()).await.unwrap();
    }

    #[tokio::test]
    async fn damaged_record_is_reported_as_corrupt() {
        let repo = InMemoryRepository::new();
        repo.insert_raw(&key(), r#"{"answers":"oops"}"#).unwrap();

        let err = repo.get_state(&key()).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(ExamStateError::UnknownShape)));
    }
}
