use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::PresentationError;
use crate::exam::{ExamEvent, TaskHandle};

const CHANGE_CAPACITY: usize = 16;

/// A change of the platform's presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationChange {
    Entered,
    Exited,
}

/// Platform API for exclusive (full-screen) presentation.
#[async_trait]
pub trait PresentationMode: Send + Sync {
    /// Ask the platform for exclusive presentation.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError` if the platform refuses or fails.
    async fn request_exclusive(&self) -> Result<(), PresentationError>;

    /// Leave exclusive presentation. A no-op when not exclusive.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError` if the platform fails to leave it.
    async fn exit_exclusive(&self) -> Result<(), PresentationError>;

    /// Subscribe to mode changes from now on.
    fn subscribe(&self) -> broadcast::Receiver<PresentationChange>;

    fn is_exclusive(&self) -> bool;
}

//
// ─── SIMULATED BACKEND ─────────────────────────────────────────────────────────
//

/// In-memory presentation backend for tests and terminals without a
/// full-screen API.
pub struct SimulatedPresentation {
    exclusive: AtomicBool,
    refusals: AtomicU32,
    changes: broadcast::Sender<PresentationChange>,
}

impl Default for SimulatedPresentation {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPresentation {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            exclusive: AtomicBool::new(false),
            refusals: AtomicU32::new(0),
            changes,
        }
    }

    /// Refuse the next `count` exclusive-mode requests.
    pub fn refuse_next(&self, count: u32) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// The candidate leaves full-screen on their own (Esc, window switch).
    pub fn leave(&self) {
        self.set_exclusive(false);
    }

    fn set_exclusive(&self, exclusive: bool) {
        if self.exclusive.swap(exclusive, Ordering::SeqCst) != exclusive {
            let change = if exclusive {
                PresentationChange::Entered
            } else {
                PresentationChange::Exited
            };
            // No subscribers is fine.
            let _ = self.changes.send(change);
        }
    }
}

#[async_trait]
impl PresentationMode for SimulatedPresentation {
    async fn request_exclusive(&self) -> Result<(), PresentationError> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(PresentationError::Refused("request denied by platform".into()));
        }
        self.set_exclusive(true);
        Ok(())
    }

    async fn exit_exclusive(&self) -> Result<(), PresentationError> {
        self.set_exclusive(false);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PresentationChange> {
        self.changes.subscribe()
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive.load(Ordering::SeqCst)
    }
}

//
// ─── GUARD ─────────────────────────────────────────────────────────────────────
//

/// Keeps the exam in exclusive presentation while it is active and reports
/// each exit once.
///
/// The guard is armed only between `engage` and `disarm`/`release`; outside of
/// that window it holds no subscription and reports nothing.
pub struct FullscreenGuard {
    presentation: Arc<dyn PresentationMode>,
    watcher: Option<TaskHandle>,
}

impl FullscreenGuard {
    #[must_use]
    pub fn new(presentation: Arc<dyn PresentationMode>) -> Self {
        Self {
            presentation,
            watcher: None,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.watcher.is_some()
    }

    /// Request exclusive presentation and start watching for an exit.
    ///
    /// The first exit after a successful request sends one
    /// `PresentationExited` event tagged with `generation`.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError` if the request is refused; the guard stays
    /// disarmed.
    pub async fn engage(
        &mut self,
        generation: u64,
        events: UnboundedSender<ExamEvent>,
    ) -> Result<(), PresentationError> {
        self.watcher = None;
        // Subscribe first so an exit racing the request is not missed.
        let changes = self.presentation.subscribe();
        self.presentation.request_exclusive().await?;
        debug!(generation, "exclusive presentation engaged");
        self.watcher = Some(watch(
            Arc::clone(&self.presentation),
            changes,
            generation,
            events,
        ));
        Ok(())
    }

    /// Drop the subscription without touching the presentation mode.
    pub fn disarm(&mut self) {
        self.watcher = None;
    }

    /// Disarm and leave exclusive presentation.
    pub async fn release(&mut self) {
        self.disarm();
        if let Err(err) = self.presentation.exit_exclusive().await {
            warn!(error = %err, "failed to leave exclusive presentation");
        }
    }
}

fn watch(
    presentation: Arc<dyn PresentationMode>,
    mut changes: broadcast::Receiver<PresentationChange>,
    generation: u64,
    events: UnboundedSender<ExamEvent>,
) -> TaskHandle {
    TaskHandle::spawn(async move {
        loop {
            let exited = match changes.recv().await {
                Ok(PresentationChange::Exited) => true,
                Ok(PresentationChange::Entered) => false,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "presentation changes lagged");
                    !presentation.is_exclusive()
                }
                Err(RecvError::Closed) => break,
            };
            if exited {
                let _ = events.send(ExamEvent::presentation_exited(generation));
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::ExamEventKind;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn reports_one_event_per_exit() {
        let presentation = Arc::new(SimulatedPresentation::new());
        let mut guard = FullscreenGuard::new(presentation.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        guard.engage(1, tx.clone()).await.unwrap();
        assert!(presentation.is_exclusive());

        presentation.leave();
        presentation.leave();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), ExamEventKind::PresentationExited);
        assert_eq!(event.generation(), 1);

        // A second exit without re-engaging stays silent.
        presentation.request_exclusive().await.unwrap();
        presentation.leave();
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn refused_request_leaves_guard_disarmed() {
        let presentation = Arc::new(SimulatedPresentation::new());
        presentation.refuse_next(1);
        let mut guard = FullscreenGuard::new(presentation.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = guard.engage(1, tx.clone()).await.unwrap_err();
        assert!(matches!(err, PresentationError::Refused(_)));
        assert!(!guard.is_armed());

        guard.engage(2, tx).await.unwrap();
        assert!(guard.is_armed());
    }

    #[tokio::test]
    async fn disarmed_guard_is_inert() {
        let presentation = Arc::new(SimulatedPresentation::new());
        let mut guard = FullscreenGuard::new(presentation.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        guard.engage(1, tx).await.unwrap();
        guard.disarm();
        presentation.leave();
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn release_leaves_exclusive_mode() {
        let presentation = Arc::new(SimulatedPresentation::new());
        let mut guard = FullscreenGuard::new(presentation.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        guard.engage(1, tx).await.unwrap();
        guard.release().await;
        assert!(!presentation.is_exclusive());
        assert!(!guard.is_armed());
    }
}
