use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionId;

/// Free-text answers keyed by question.
///
/// Only questions the candidate touched have an entry. An entry cleared back to
/// the empty string is kept (the question was touched) but does not count as
/// answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<QuestionId, String>);

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` as the answer to `question`, replacing any previous one.
    pub fn set(&mut self, question: QuestionId, text: impl Into<String>) {
        self.0.insert(question, text.into());
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&str> {
        self.0.get(question).map(String::as_str)
    }

    /// True when the question has a non-blank answer.
    #[must_use]
    pub fn is_answered(&self, question: &QuestionId) -> bool {
        self.get(question).is_some_and(|text| !text.trim().is_empty())
    }

    /// Number of questions with a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.0.values().filter(|text| !text.trim().is_empty()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
