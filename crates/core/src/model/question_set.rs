use thiserror::Error;

use crate::model::ids::UnitId;
use crate::model::unit::{Question, Unit, UnitDetail};

/// Remaining time below which the countdown is shown as running low.
pub const LOW_TIME_THRESHOLD_SECONDS: u32 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("scheme has no units")]
    NoUnits,

    #[error("scheme has no theory questions")]
    NoQuestions,

    #[error("got {lists} question lists for {units} units")]
    ListCountMismatch { units: usize, lists: usize },
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// The ordered units of a scheme and their theory questions, flattened in unit
/// order then fetch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    details: Vec<UnitDetail>,
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Combine units with the question list fetched for each of them.
    ///
    /// `per_unit[i]` must hold the questions of `units[i]`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError` if there are no units, no questions at all,
    /// or the list counts disagree.
    pub fn from_parts(
        units: Vec<Unit>,
        per_unit: Vec<Vec<Question>>,
    ) -> Result<Self, QuestionSetError> {
        if units.is_empty() {
            return Err(QuestionSetError::NoUnits);
        }
        if units.len() != per_unit.len() {
            return Err(QuestionSetError::ListCountMismatch {
                units: units.len(),
                lists: per_unit.len(),
            });
        }

        let mut details = Vec::with_capacity(units.len());
        let mut questions = Vec::new();
        for (unit, unit_questions) in units.into_iter().zip(per_unit) {
            details.push(UnitDetail {
                unit,
                question_count: unit_questions.len(),
            });
            questions.extend(unit_questions);
        }

        if questions.is_empty() {
            return Err(QuestionSetError::NoQuestions);
        }

        Ok(Self { details, questions })
    }

    #[must_use]
    pub fn details(&self) -> &[UnitDetail] {
        &self.details
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.details
            .iter()
            .map(|detail| &detail.unit)
            .find(|unit| &unit.id == id)
    }

    /// Sum of all unit theory budgets, in minutes.
    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.details
            .iter()
            .fold(0_u32, |acc, d| acc.saturating_add(d.unit.theory_duration_minutes))
    }

    /// Sum of all unit theory budgets, in seconds.
    #[must_use]
    pub fn total_duration_seconds(&self) -> u32 {
        self.total_duration_minutes().saturating_mul(60)
    }

    #[must_use]
    pub fn summary(&self) -> ExamSummary {
        ExamSummary {
            units: self.details.clone(),
            question_count: self.questions.len(),
            total_minutes: self.total_duration_minutes(),
        }
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// What the candidate sees before pressing Start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSummary {
    pub units: Vec<UnitDetail>,
    pub question_count: usize,
    pub total_minutes: u32,
}

impl ExamSummary {
    #[must_use]
    pub fn question_label(&self) -> String {
        format!("{} Soal", self.question_count)
    }

    #[must_use]
    pub fn duration_label(&self) -> String {
        format!("{} menit", self.total_minutes)
    }

    /// One line per unit: `Unit 1: Title — 3 Soal (15 Menit)`.
    #[must_use]
    pub fn unit_lines(&self) -> Vec<String> {
        self.units
            .iter()
            .map(|d| {
                format!(
                    "Unit {}: {} — {} Soal ({} Menit)",
                    d.unit.order, d.unit.title, d.question_count, d.unit.theory_duration_minutes
                )
            })
            .collect()
    }
}

/// Render remaining seconds as `MM:SS`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
