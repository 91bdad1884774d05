use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use exam_core::model::{
    AnswerMap, CandidateId, EligibilityRecord, Question, QuestionCategory, SchemeId, Unit, UnitId,
};

use super::{EligibilityLookup, PortalError, QuestionBank, SubmissionReceipt, SubmissionSink};

#[derive(Default)]
struct PortalState {
    records: HashMap<CandidateId, EligibilityRecord>,
    units: HashMap<SchemeId, Vec<Unit>>,
    questions: HashMap<UnitId, Vec<Question>>,
    failing_lookups: bool,
    failing_units: HashSet<UnitId>,
    failing_submissions: u32,
    unit_fetches: u32,
    question_fetches: u32,
    submit_calls: u32,
    submissions: Vec<(CandidateId, AnswerMap)>,
}

/// Scriptable in-memory portal for tests and offline runs.
///
/// A successful submission marks the candidate's theory exam as completed.
#[derive(Clone, Default)]
pub struct InMemoryPortal {
    state: Arc<Mutex<PortalState>>,
}

impl InMemoryPortal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, PortalState>, PortalError> {
        self.state
            .lock()
            .map_err(|e| PortalError::Unavailable(e.to_string()))
    }

    // Setup and inspection helpers tolerate a poisoned lock.
    fn setup(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_eligibility(self, candidate: CandidateId, record: EligibilityRecord) -> Self {
        self.setup().records.insert(candidate, record);
        self
    }

    #[must_use]
    pub fn with_units(self, scheme: SchemeId, units: Vec<Unit>) -> Self {
        self.setup().units.insert(scheme, units);
        self
    }

    #[must_use]
    pub fn with_questions(self, unit: UnitId, questions: Vec<Question>) -> Self {
        self.setup().questions.insert(unit, questions);
        self
    }

    /// Make every eligibility lookup fail until cleared.
    pub fn set_lookup_failing(&self, failing: bool) {
        self.setup().failing_lookups = failing;
    }

    /// Make question fetches for `unit` fail until cleared.
    pub fn set_unit_failing(&self, unit: UnitId, failing: bool) {
        let mut state = self.setup();
        if failing {
            state.failing_units.insert(unit);
        } else {
            state.failing_units.remove(&unit);
        }
    }

    /// Reject the next `count` submissions.
    pub fn fail_next_submissions(&self, count: u32) {
        self.setup().failing_submissions = count;
    }

    #[must_use]
    pub fn unit_fetches(&self) -> u32 {
        self.setup().unit_fetches
    }

    #[must_use]
    pub fn question_fetches(&self) -> u32 {
        self.setup().question_fetches
    }

    /// Number of submission attempts, successful or not.
    #[must_use]
    pub fn submit_calls(&self) -> u32 {
        self.setup().submit_calls
    }

    /// Accepted submissions in arrival order.
    #[must_use]
    pub fn submissions(&self) -> Vec<(CandidateId, AnswerMap)> {
        self.setup().submissions.clone()
    }
}

#[async_trait]
impl EligibilityLookup for InMemoryPortal {
    async fn exam_status(&self, candidate: &CandidateId) -> Result<EligibilityRecord, PortalError> {
        let state = self.lock()?;
        if state.failing_lookups {
            return Err(PortalError::Unavailable("eligibility lookup failed".into()));
        }
        state
            .records
            .get(candidate)
            .cloned()
            .ok_or_else(|| PortalError::Unavailable(format!("unknown candidate {candidate}")))
    }
}

#[async_trait]
impl QuestionBank for InMemoryPortal {
    async fn units_for_scheme(&self, scheme: &SchemeId) -> Result<Vec<Unit>, PortalError> {
        let mut state = self.lock()?;
        state.unit_fetches += 1;
        Ok(state.units.get(scheme).cloned().unwrap_or_default())
    }

    async fn questions_for_unit(
        &self,
        unit: &UnitId,
        _category: QuestionCategory,
    ) -> Result<Vec<Question>, PortalError> {
        let mut state = self.lock()?;
        state.question_fetches += 1;
        if state.failing_units.contains(unit) {
            return Err(PortalError::Unavailable(format!("questions for {unit} failed")));
        }
        Ok(state.questions.get(unit).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SubmissionSink for InMemoryPortal {
    async fn submit_theory(
        &self,
        candidate: &CandidateId,
        answers: &AnswerMap,
    ) -> Result<SubmissionReceipt, PortalError> {
        let mut state = self.lock()?;
        state.submit_calls += 1;
        if state.failing_submissions > 0 {
            state.failing_submissions -= 1;
            return Err(PortalError::Unavailable("submission rejected".into()));
        }

        state.submissions.push((candidate.clone(), answers.clone()));
        if let Some(record) = state.records.get_mut(candidate) {
            record.completed = true;
        }
        Ok(SubmissionReceipt {
            submission_id: format!("sub-{}", state.submissions.len()),
        })
    }
}
