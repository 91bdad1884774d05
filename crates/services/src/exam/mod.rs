//! The exam session: controller state machine, countdown and write-through
//! persistence.

mod controller;
mod countdown;
mod persistence;

use std::future::Future;
use tokio::task::JoinHandle;

pub use controller::{ControllerDeps, ExamSessionController, QuestionMarker, SubmitPrompt};

/// What woke the controller up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamEventKind {
    /// One second of exam time elapsed.
    Tick,
    /// The candidate left exclusive presentation.
    PresentationExited,
}

/// An event from a background source, tagged with the activation it belongs
/// to. Events from an earlier activation are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamEvent {
    generation: u64,
    kind: ExamEventKind,
}

impl ExamEvent {
    pub(crate) fn tick(generation: u64) -> Self {
        Self {
            generation,
            kind: ExamEventKind::Tick,
        }
    }

    pub(crate) fn presentation_exited(generation: u64) -> Self {
        Self {
            generation,
            kind: ExamEventKind::PresentationExited,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn kind(&self) -> ExamEventKind {
        self.kind
    }
}

/// Owns a spawned task and aborts it when dropped.
#[derive(Debug)]
pub(crate) struct TaskHandle(JoinHandle<()>);

impl TaskHandle {
    pub(crate) fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(task))
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}
