use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, UnitId};

/// Theory duration assumed for a unit whose record omits one.
pub const DEFAULT_THEORY_MINUTES: u32 = 15;

fn default_theory_minutes() -> u32 {
    DEFAULT_THEORY_MINUTES
}

//
// ─── UNIT ──────────────────────────────────────────────────────────────────────
//

/// A competency unit of a scheme, as fetched for one exam session.
///
/// `order` drives presentation only; question order comes from the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub order: u32,
    pub title: String,
    #[serde(default = "default_theory_minutes")]
    pub theory_duration_minutes: u32,
}

impl Unit {
    #[must_use]
    pub fn new(
        id: UnitId,
        order: u32,
        title: impl Into<String>,
        theory_duration_minutes: u32,
    ) -> Self {
        Self {
            id,
            order,
            title: title.into(),
            theory_duration_minutes,
        }
    }

    /// Theory budget of this unit in seconds.
    #[must_use]
    pub fn theory_duration_seconds(&self) -> u32 {
        self.theory_duration_minutes.saturating_mul(60)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Category requested from the question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionCategory {
    Theory,
}

impl QuestionCategory {
    /// Wire name understood by the question bank.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionCategory::Theory => "UJIAN_TEORI",
        }
    }
}

/// A free-text theory question belonging to exactly one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub unit_id: UnitId,
    pub text: String,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, unit_id: UnitId, text: impl Into<String>) -> Self {
        Self {
            id,
            unit_id,
            text: text.into(),
        }
    }
}

/// A unit together with the number of theory questions fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDetail {
    pub unit: Unit,
    pub question_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_duration_defaults_to_fifteen_minutes() {
        let unit: Unit =
            serde_json::from_str(r#"{"id":"U1","order":1,"title":"Data"}"#).unwrap();
        assert_eq!(unit.theory_duration_minutes, DEFAULT_THEORY_MINUTES);
        assert_eq!(unit.theory_duration_seconds(), 900);
    }

    #[test]
    fn question_reads_camel_case_fields() {
        let q: Question =
            serde_json::from_str(r#"{"id":"Q1","unitId":"U1","text":"Explain joins"}"#).unwrap();
        assert_eq!(q.unit_id, UnitId::new("U1"));
    }
}
