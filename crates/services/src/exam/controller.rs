use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use exam_core::model::{
    AnswerMap, CandidateId, ExamState, ExamStateKey, ExamSummary, LOW_TIME_THRESHOLD_SECONDS,
    Question, QuestionSet, ScheduleInfo, SchemeId, SessionPhase, Unit, format_clock,
};
use storage::repository::ExamStateRepository;

use super::countdown::{TICK_PERIOD, spawn_countdown};
use super::persistence::StatePersister;
use super::{ExamEvent, ExamEventKind, TaskHandle};
use crate::config::DEFAULT_PERSIST_WARN_AFTER;
use crate::eligibility::{Denial, Eligibility, EligibilityGate};
use crate::error::{ExamError, PresentationError};
use crate::fullscreen::{FullscreenGuard, PresentationMode};
use crate::loader::QuestionSetLoader;
use crate::portal::{SubmissionReceipt, SubmissionSink};

/// Collaborators injected into an `ExamSessionController`.
pub struct ControllerDeps {
    pub gate: EligibilityGate,
    pub loader: QuestionSetLoader,
    pub sink: Arc<dyn SubmissionSink>,
    pub store: Arc<dyn ExamStateRepository>,
    pub presentation: Arc<dyn PresentationMode>,
}

/// Navigation-strip entry for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionMarker {
    pub index: usize,
    pub answered: bool,
    pub current: bool,
}

/// Data for the confirmation shown before a manual submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitPrompt {
    pub answered: usize,
    pub total: usize,
}

impl SubmitPrompt {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Anda telah menjawab {} dari {} soal. Kirim jawaban sekarang?",
            self.answered, self.total
        )
    }
}

/// State machine for one candidate's theory exam.
///
/// The controller is driven from a single task: user actions are method calls
/// and background sources (countdown, presentation watcher) arrive through
/// [`next_event`](Self::next_event) and [`handle_event`](Self::handle_event).
/// Every activation gets a new generation; events from older activations are
/// dropped.
pub struct ExamSessionController {
    candidate: CandidateId,
    scheme: SchemeId,
    gate: EligibilityGate,
    loader: QuestionSetLoader,
    sink: Arc<dyn SubmissionSink>,
    persister: StatePersister,
    guard: FullscreenGuard,

    phase: SessionPhase,
    denial: Option<Denial>,
    schedule: Option<ScheduleInfo>,
    load_error: Option<String>,
    questions: Option<QuestionSet>,
    answers: AnswerMap,
    time_left: u32,
    current: usize,

    generation: u64,
    tick_period: Duration,
    countdown: Option<TaskHandle>,
    events_tx: UnboundedSender<ExamEvent>,
    events_rx: UnboundedReceiver<ExamEvent>,

    fullscreen_prompt: bool,
    integrity_pauses: u32,
    submit_error: Option<String>,
    receipt: Option<SubmissionReceipt>,
}

impl ExamSessionController {
    #[must_use]
    pub fn new(candidate: CandidateId, scheme: SchemeId, deps: ControllerDeps) -> Self {
        let key = ExamStateKey::for_exam(&candidate, &scheme);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            candidate,
            scheme,
            gate: deps.gate,
            loader: deps.loader,
            sink: deps.sink,
            persister: StatePersister::new(deps.store, key, DEFAULT_PERSIST_WARN_AFTER),
            guard: FullscreenGuard::new(deps.presentation),
            phase: SessionPhase::CheckingEligibility,
            denial: None,
            schedule: None,
            load_error: None,
            questions: None,
            answers: AnswerMap::new(),
            time_left: 0,
            current: 0,
            generation: 0,
            tick_period: TICK_PERIOD,
            countdown: None,
            events_tx,
            events_rx,
            fullscreen_prompt: false,
            integrity_pauses: 0,
            submit_error: None,
            receipt: None,
        }
    }

    /// Length of one exam second. Only shortened in tests.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn with_persist_warn_after(mut self, failures: u32) -> Self {
        self.persister.set_warn_after(failures);
        self
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────
    //

    /// Check eligibility, then load questions and any saved progress.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` if the controller was already opened.
    pub async fn open(&mut self) -> Result<SessionPhase, ExamError> {
        self.expect_phase(SessionPhase::CheckingEligibility)?;
        info!(candidate = %self.candidate, scheme = %self.scheme, "opening theory exam");

        match self.gate.check(&self.candidate).await {
            Eligibility::Denied(denial) => {
                self.denial = Some(denial);
                self.set_phase(SessionPhase::Denied);
            }
            Eligibility::Approved(schedule) => {
                self.schedule = Some(schedule);
                self.load().await;
            }
        }
        Ok(self.phase)
    }

    /// Try the load again after `LoadFailed`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `LoadFailed`.
    pub async fn retry_load(&mut self) -> Result<SessionPhase, ExamError> {
        self.expect_phase(SessionPhase::LoadFailed)?;
        self.load().await;
        Ok(self.phase)
    }

    async fn load(&mut self) {
        self.set_phase(SessionPhase::Loading);
        self.load_error = None;

        let questions = match self.loader.load(&self.scheme).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(scheme = %self.scheme, error = %err, "failed to load questions");
                self.load_error = Some(err.to_string());
                self.set_phase(SessionPhase::LoadFailed);
                return;
            }
        };
        let saved = match self.persister.restore().await {
            Ok(saved) => saved,
            Err(err) => {
                warn!(candidate = %self.candidate, error = %err, "failed to read saved exam state");
                self.load_error = Some(err.to_string());
                self.set_phase(SessionPhase::LoadFailed);
                return;
            }
        };

        let total = questions.total_duration_seconds();
        self.questions = Some(questions);
        let Some(state) = saved else {
            self.set_phase(SessionPhase::NotStarted);
            return;
        };

        let (answers, time_left) = state.clamped_to(total).into_parts();
        self.answers = answers;
        self.time_left = time_left;
        info!(
            candidate = %self.candidate,
            time_left,
            answered = self.answered_count(),
            "resuming saved exam"
        );
        if time_left == 0 {
            info!(candidate = %self.candidate, "exam time ran out while away; submitting");
            // Failure leaves the controller in Submitting for a retry.
            let _ = self.finish().await;
        } else {
            let _ = self.activate().await;
        }
    }

    /// Start a fresh exam with the full time budget.
    ///
    /// If exclusive presentation is refused the exam is saved and paused with
    /// the full-screen prompt raised.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `NotStarted`.
    pub async fn start(&mut self) -> Result<(), ExamError> {
        self.expect_phase(SessionPhase::NotStarted)?;
        self.answers = AnswerMap::new();
        self.time_left = self.total_duration_seconds();
        self.current = 0;
        self.persist().await;
        info!(candidate = %self.candidate, time_left = self.time_left, "exam started");

        let _ = self.activate().await;
        Ok(())
    }

    /// Re-enter exclusive presentation after an integrity pause.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `PausedIntegrity`, or
    /// `ExamError::Presentation` if the request is refused again.
    pub async fn reengage(&mut self) -> Result<(), ExamError> {
        self.expect_phase(SessionPhase::PausedIntegrity)?;
        self.activate().await?;
        info!(candidate = %self.candidate, time_left = self.time_left, "exam resumed");
        Ok(())
    }

    /// Submit the current answers. Allowed while `Active`, and while resting in
    /// `Submitting` after a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` in other phases, or
    /// `ExamError::Submission` if the sink rejects the answers.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, ExamError> {
        match self.phase {
            SessionPhase::Active => {}
            SessionPhase::Submitting if self.submit_error.is_some() => {}
            other => return Err(ExamError::InvalidPhase(other)),
        }
        self.finish().await
    }

    /// Tear down background tasks. Saved progress is kept for a later resume.
    pub fn close(&mut self) {
        self.countdown = None;
        self.guard.disarm();
        debug!(candidate = %self.candidate, phase = %self.phase, "exam view closed");
    }

    async fn activate(&mut self) -> Result<(), PresentationError> {
        self.generation += 1;
        self.countdown = None;
        if let Err(err) = self
            .guard
            .engage(self.generation, self.events_tx.clone())
            .await
        {
            warn!(candidate = %self.candidate, error = %err, "exclusive presentation refused");
            self.fullscreen_prompt = true;
            self.set_phase(SessionPhase::PausedIntegrity);
            return Err(err);
        }

        self.fullscreen_prompt = false;
        self.countdown = Some(spawn_countdown(
            self.tick_period,
            self.generation,
            self.events_tx.clone(),
        ));
        self.set_phase(SessionPhase::Active);
        Ok(())
    }

    async fn finish(&mut self) -> Result<SubmissionReceipt, ExamError> {
        self.countdown = None;
        self.guard.disarm();
        self.submit_error = None;
        self.set_phase(SessionPhase::Submitting);

        match self.sink.submit_theory(&self.candidate, &self.answers).await {
            Ok(receipt) => {
                self.persister.clear().await;
                self.guard.release().await;
                info!(
                    candidate = %self.candidate,
                    submission_id = %receipt.submission_id,
                    answered = self.answered_count(),
                    "exam submitted"
                );
                self.receipt = Some(receipt.clone());
                self.set_phase(SessionPhase::Submitted);
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    candidate = %self.candidate,
                    time_left = self.time_left,
                    error = %err,
                    "submission failed"
                );
                self.submit_error = Some(err.to_string());
                if self.time_left > 0 {
                    let _ = self.activate().await;
                }
                Err(ExamError::Submission(err))
            }
        }
    }

    //
    // ─── EVENTS ────────────────────────────────────────────────────────────────
    //

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> Option<ExamEvent> {
        self.events_rx.recv().await
    }

    /// Apply a background event. Stale events and events outside `Active` are
    /// ignored.
    pub async fn handle_event(&mut self, event: ExamEvent) {
        if event.generation() != self.generation || self.phase != SessionPhase::Active {
            debug!(?event, current = self.generation, phase = %self.phase, "ignoring stale exam event");
            return;
        }
        match event.kind() {
            ExamEventKind::Tick => self.on_tick().await,
            ExamEventKind::PresentationExited => self.on_presentation_exited().await,
        }
    }

    /// Wait for one event and apply it.
    pub async fn pump(&mut self) -> Option<ExamEvent> {
        let event = self.next_event().await?;
        self.handle_event(event).await;
        Some(event)
    }

    async fn on_tick(&mut self) {
        self.time_left = self.time_left.saturating_sub(1);
        self.persist().await;
        if self.time_left == 0 {
            info!(candidate = %self.candidate, "exam time is up; submitting");
            let _ = self.finish().await;
        }
    }

    async fn on_presentation_exited(&mut self) {
        self.countdown = None;
        self.guard.disarm();
        self.integrity_pauses += 1;
        self.persist().await;
        warn!(
            candidate = %self.candidate,
            pauses = self.integrity_pauses,
            time_left = self.time_left,
            "candidate left full-screen; exam paused"
        );
        self.set_phase(SessionPhase::PausedIntegrity);
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Replace the current question's answer and save immediately.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `Active`.
    pub async fn edit_answer(&mut self, text: impl Into<String>) -> Result<(), ExamError> {
        self.expect_phase(SessionPhase::Active)?;
        let id = self
            .current_question()
            .map(|question| question.id.clone())
            .ok_or(ExamError::NoQuestion)?;
        self.answers.set(id, text);
        self.persist().await;
        Ok(())
    }

    /// Move to the next question; stays put on the last one.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `Active`.
    pub fn next(&mut self) -> Result<usize, ExamError> {
        self.go_to(self.current + 1)
    }

    /// Move to the previous question; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `Active`.
    pub fn previous(&mut self) -> Result<usize, ExamError> {
        match self.current.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => {
                self.expect_phase(SessionPhase::Active)?;
                Ok(self.current)
            }
        }
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidPhase` outside `Active`.
    pub fn go_to(&mut self, index: usize) -> Result<usize, ExamError> {
        self.expect_phase(SessionPhase::Active)?;
        if index < self.question_count() {
            self.current = index;
        }
        Ok(self.current)
    }

    //
    // ─── VIEW STATE ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn candidate(&self) -> &CandidateId {
        &self.candidate
    }

    #[must_use]
    pub fn scheme(&self) -> &SchemeId {
        &self.scheme
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn denial(&self) -> Option<&Denial> {
        self.denial.as_ref()
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&ScheduleInfo> {
        self.schedule.as_ref()
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn summary(&self) -> Option<ExamSummary> {
        self.questions.as_ref().map(QuestionSet::summary)
    }

    #[must_use]
    pub fn time_left_seconds(&self) -> u32 {
        self.time_left
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn clock_label(&self) -> String {
        format_clock(self.time_left)
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        self.time_left < LOW_TIME_THRESHOLD_SECONDS
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.as_ref().map_or(0, QuestionSet::len)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.as_ref()?.question(self.current)
    }

    #[must_use]
    pub fn current_unit(&self) -> Option<&Unit> {
        let question = self.current_question()?;
        self.questions.as_ref()?.unit(&question.unit_id)
    }

    #[must_use]
    pub fn current_answer(&self) -> &str {
        self.current_question()
            .and_then(|question| self.answers.get(&question.id))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn question_markers(&self) -> Vec<QuestionMarker> {
        self.questions
            .as_ref()
            .map(|set| {
                set.questions()
                    .iter()
                    .enumerate()
                    .map(|(index, question)| QuestionMarker {
                        index,
                        answered: self.answers.is_answered(&question.id),
                        current: index == self.current,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Questions of the loaded set with a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.questions.as_ref().map_or(0, |set| {
            set.questions()
                .iter()
                .filter(|question| self.answers.is_answered(&question.id))
                .count()
        })
    }

    /// Confirmation data for a manual submit; only while `Active`.
    #[must_use]
    pub fn submit_prompt(&self) -> Option<SubmitPrompt> {
        self.phase.is_active().then(|| SubmitPrompt {
            answered: self.answered_count(),
            total: self.question_count(),
        })
    }

    /// True while the exam waits for the candidate to grant full-screen after a
    /// refused request.
    #[must_use]
    pub fn fullscreen_prompt(&self) -> bool {
        self.fullscreen_prompt
    }

    #[must_use]
    pub fn integrity_pauses(&self) -> u32 {
        self.integrity_pauses
    }

    #[must_use]
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    #[must_use]
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    /// True once saves have failed often enough that a reload may lose
    /// progress.
    #[must_use]
    pub fn persistence_warning(&self) -> bool {
        self.persister.resumability_compromised()
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn total_duration_seconds(&self) -> u32 {
        self.questions
            .as_ref()
            .map_or(0, QuestionSet::total_duration_seconds)
    }

    fn expect_phase(&self, expected: SessionPhase) -> Result<(), ExamError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ExamError::InvalidPhase(self.phase))
        }
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase != next {
            info!(
                candidate = %self.candidate,
                scheme = %self.scheme,
                from = %self.phase,
                to = %next,
                time_left = self.time_left,
                "exam phase changed"
            );
            self.phase = next;
        }
    }

    async fn persist(&mut self) {
        let state = ExamState::new(self.answers.clone(), self.time_left);
        self.persister.save(&state).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use exam_core::Clock;
    use exam_core::model::{EligibilityRecord, QuestionId, UnitId};
    use storage::repository::InMemoryRepository;

    use crate::fullscreen::SimulatedPresentation;
    use crate::portal::InMemoryPortal;

    fn portal() -> InMemoryPortal {
        let schedule = ScheduleInfo {
            date: exam_core::model::parse_schedule_date("2026-10-18").unwrap(),
            time: "09:00".into(),
            room: "Lab 1".into(),
        };
        InMemoryPortal::new()
            .with_eligibility(
                CandidateId::new("c1"),
                EligibilityRecord {
                    prerequisite_met: true,
                    scheduled: true,
                    completed: false,
                    schedule: Some(schedule),
                },
            )
            .with_units(
                SchemeId::new("ADS"),
                vec![Unit::new(UnitId::new("U1"), 1, "Basics", 1)],
            )
            .with_questions(
                UnitId::new("U1"),
                vec![
                    Question::new(QuestionId::new("Q1"), UnitId::new("U1"), "First"),
                    Question::new(QuestionId::new("Q2"), UnitId::new("U1"), "Second"),
                ],
            )
    }

    fn controller(portal: &InMemoryPortal) -> ExamSessionController {
        controller_with(portal, Arc::new(SimulatedPresentation::new()))
    }

    fn controller_with(
        portal: &InMemoryPortal,
        presentation: Arc<dyn PresentationMode>,
    ) -> ExamSessionController {
        let clock = Clock::fixed(Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap());
        let portal = Arc::new(portal.clone());
        ExamSessionController::new(
            CandidateId::new("c1"),
            SchemeId::new("ADS"),
            ControllerDeps {
                gate: EligibilityGate::new(clock, portal.clone()),
                loader: QuestionSetLoader::new(portal.clone()),
                sink: portal,
                store: Arc::new(InMemoryRepository::new()),
                presentation,
            },
        )
    }

    #[tokio::test]
    async fn actions_are_rejected_in_the_wrong_phase() {
        let portal = portal();
        let mut ctl = controller(&portal);

        assert!(matches!(
            ctl.start().await,
            Err(ExamError::InvalidPhase(SessionPhase::CheckingEligibility))
        ));
        assert_eq!(ctl.open().await.unwrap(), SessionPhase::NotStarted);
        assert!(matches!(ctl.open().await, Err(ExamError::InvalidPhase(_))));
        assert!(matches!(ctl.edit_answer("x").await, Err(ExamError::InvalidPhase(_))));
        assert!(matches!(ctl.submit().await, Err(ExamError::InvalidPhase(_))));
        assert!(ctl.submit_prompt().is_none());
    }

    #[tokio::test]
    async fn navigation_clamps_to_the_question_range() {
        let portal = portal();
        let mut ctl = controller(&portal);
        ctl.open().await.unwrap();
        ctl.start().await.unwrap();

        assert_eq!(ctl.previous().unwrap(), 0);
        assert_eq!(ctl.next().unwrap(), 1);
        assert_eq!(ctl.next().unwrap(), 1);
        assert_eq!(ctl.go_to(7).unwrap(), 1);
        assert_eq!(ctl.go_to(0).unwrap(), 0);
        assert_eq!(ctl.current_unit().map(|u| u.title.as_str()), Some("Basics"));
    }

    #[tokio::test]
    async fn markers_and_prompt_track_answers() {
        let portal = portal();
        let mut ctl = controller(&portal);
        ctl.open().await.unwrap();
        ctl.start().await.unwrap();

        ctl.edit_answer("an answer").await.unwrap();
        ctl.next().unwrap();
        ctl.edit_answer("   ").await.unwrap();

        let markers = ctl.question_markers();
        assert!(markers[0].answered && !markers[0].current);
        assert!(!markers[1].answered && markers[1].current);

        let prompt = ctl.submit_prompt().unwrap();
        assert_eq!((prompt.answered, prompt.total, prompt.unanswered()), (1, 2, 1));
        assert!(prompt.message().contains("1 dari 2"));
        assert_eq!(ctl.clock_label(), "01:00");
        assert!(ctl.is_low_time());
    }

    #[tokio::test]
    async fn submitted_controller_is_not_reused() {
        let portal = portal();
        let mut ctl = controller(&portal);
        ctl.open().await.unwrap();
        ctl.start().await.unwrap();

        let receipt = ctl.submit().await.unwrap();
        assert_eq!(receipt.submission_id, "sub-1");
        assert_eq!(ctl.phase(), SessionPhase::Submitted);
        assert!(matches!(
            ctl.submit().await,
            Err(ExamError::InvalidPhase(SessionPhase::Submitted))
        ));
        assert!(ctl.next().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_an_earlier_activation_are_ignored() {
        let portal = portal();
        let mut ctl = controller(&portal);
        ctl.open().await.unwrap();
        ctl.start().await.unwrap();
        let first = ctl.generation;

        ctl.handle_event(ExamEvent::tick(first)).await;
        assert_eq!(ctl.time_left_seconds(), 59);

        ctl.handle_event(ExamEvent::presentation_exited(first)).await;
        assert_eq!(ctl.phase(), SessionPhase::PausedIntegrity);
        assert_eq!(ctl.integrity_pauses(), 1);

        // A tick of the current activation that lands after the pause.
        ctl.handle_event(ExamEvent::tick(first)).await;
        assert_eq!(ctl.time_left_seconds(), 59);
        assert_eq!(ctl.phase(), SessionPhase::PausedIntegrity);

        ctl.reengage().await.unwrap();
        assert_ne!(ctl.generation, first);

        ctl.handle_event(ExamEvent::tick(first)).await;
        ctl.handle_event(ExamEvent::presentation_exited(first)).await;
        assert_eq!(ctl.time_left_seconds(), 59);
        assert_eq!(ctl.phase(), SessionPhase::Active);
        assert_eq!(ctl.integrity_pauses(), 1);

        ctl.handle_event(ExamEvent::tick(ctl.generation)).await;
        assert_eq!(ctl.time_left_seconds(), 58);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_request_leaves_the_exam_paused_with_a_prompt() {
        let portal = portal();
        let presentation = Arc::new(SimulatedPresentation::new());
        presentation.refuse_next(1);
        let mut ctl = controller_with(&portal, presentation);
        ctl.open().await.unwrap();

        assert!(ctl.start().await.is_ok());
        assert_eq!(ctl.phase(), SessionPhase::PausedIntegrity);
        assert!(ctl.fullscreen_prompt());
        assert_eq!(ctl.integrity_pauses(), 0);

        ctl.handle_event(ExamEvent::tick(ctl.generation)).await;
        assert_eq!(ctl.time_left_seconds(), 60);
    }
}
