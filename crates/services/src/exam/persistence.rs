use std::sync::Arc;
use tracing::{error, info, warn};

use exam_core::model::{ExamState, ExamStateKey};
use storage::repository::{ExamStateRepository, StorageError};

/// Write-through persistence of one exam's state.
///
/// Saves never fail the caller. Consecutive failures are counted; once they
/// reach `warn_after` the saved state can no longer be trusted for a resume.
pub(crate) struct StatePersister {
    repo: Arc<dyn ExamStateRepository>,
    key: ExamStateKey,
    warn_after: u32,
    consecutive_failures: u32,
}

impl StatePersister {
    pub(crate) fn new(repo: Arc<dyn ExamStateRepository>, key: ExamStateKey, warn_after: u32) -> Self {
        Self {
            repo,
            key,
            warn_after: warn_after.max(1),
            consecutive_failures: 0,
        }
    }

    pub(crate) fn set_warn_after(&mut self, warn_after: u32) {
        self.warn_after = warn_after.max(1);
    }

    /// Read the saved state once at load.
    ///
    /// A record that cannot be decoded is discarded and treated as absent.
    pub(crate) async fn restore(&self) -> Result<Option<ExamState>, StorageError> {
        match self.repo.get_state(&self.key).await {
            Ok(state) => Ok(state),
            Err(StorageError::Corrupt(err)) => {
                warn!(key = %self.key, error = %err, "discarding unreadable exam state");
                if let Err(err) = self.repo.delete_state(&self.key).await {
                    warn!(key = %self.key, error = %err, "failed to delete unreadable exam state");
                }
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn save(&mut self, state: &ExamState) {
        match self.repo.set_state(&self.key, state).await {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!(key = %self.key, failures = self.consecutive_failures, "exam state saved again");
                }
                self.consecutive_failures = 0;
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures == self.warn_after {
                    error!(
                        key = %self.key,
                        failures = self.consecutive_failures,
                        error = %err,
                        "exam state keeps failing to save; resume may lose progress"
                    );
                } else {
                    warn!(key = %self.key, error = %err, "failed to save exam state");
                }
            }
        }
    }

    /// Delete the saved state after a confirmed submission.
    pub(crate) async fn clear(&mut self) {
        if let Err(err) = self.repo.delete_state(&self.key).await {
            warn!(key = %self.key, error = %err, "failed to delete submitted exam state");
        }
        self.consecutive_failures = 0;
    }

    pub(crate) fn resumability_compromised(&self) -> bool {
        self.consecutive_failures >= self.warn_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exam_core::model::{AnswerMap, CandidateId, QuestionId, SchemeId};
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::InMemoryRepository;

    fn key() -> ExamStateKey {
        ExamStateKey::for_exam(&CandidateId::new("c1"), &SchemeId::new("ADS"))
    }

    /// Delegates to an in-memory store but can be switched to fail writes.
    struct FlakyStore {
        inner: InMemoryRepository,
        failing: AtomicBool,
    }

    #[async_trait]
    impl ExamStateRepository for FlakyStore {
        async fn get_state(&self, key: &ExamStateKey) -> Result<Option<ExamState>, StorageError> {
            self.inner.get_state(key).await
        }

        async fn set_state(&self, key: &ExamStateKey, state: &ExamState) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.inner.set_state(key, state).await
        }

        async fn delete_state(&self, key: &ExamStateKey) -> Result<(), StorageError> {
            self.inner.delete_state(key).await
        }
    }

    #[tokio::test]
    async fn corrupt_record_is_discarded() {
        let repo = InMemoryRepository::new();
        repo.insert_raw(&key(), "{\"version\":9}").unwrap();
        let persister = StatePersister::new(Arc::new(repo.clone()), key(), 3);

        assert!(persister.restore().await.unwrap().is_none());
        assert!(repo.raw(&key()).unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_failures_compromise_resumability_until_a_save_succeeds() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryRepository::new(),
            failing: AtomicBool::new(true),
        });
        let mut persister = StatePersister::new(store.clone(), key(), 3);
        let mut answers = AnswerMap::new();
        answers.set(QuestionId::new("Q1"), "x");
        let state = ExamState::new(answers, 60);

        persister.save(&state).await;
        persister.save(&state).await;
        assert!(!persister.resumability_compromised());
        persister.save(&state).await;
        assert!(persister.resumability_compromised());

        store.failing.store(false, Ordering::SeqCst);
        persister.save(&state).await;
        assert!(!persister.resumability_compromised());
        assert_eq!(persister.restore().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn clear_removes_the_record() {
        let repo = InMemoryRepository::new();
        let mut persister = StatePersister::new(Arc::new(repo.clone()), key(), 3);
        persister.save(&ExamState::started(120)).await;
        assert!(repo.raw(&key()).unwrap().is_some());

        persister.clear().await;
        assert!(repo.raw(&key()).unwrap().is_none());
    }
}
