use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::answers::AnswerMap;
use crate::model::ids::{CandidateId, SchemeId};

/// Current version of the persisted exam-state record.
pub const EXAM_STATE_VERSION: u32 = 1;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamStateError {
    #[error("exam state is not valid JSON: {0}")]
    Malformed(String),

    #[error("exam state has an unrecognised shape")]
    UnknownShape,

    #[error("unsupported exam state version: {0}")]
    UnsupportedVersion(String),
}

//
// ─── KEY ───────────────────────────────────────────────────────────────────────
//

/// Store key for the in-progress exam of one candidate in one scheme.
///
/// Ids are opaque and may contain `_`, so the candidate is length-prefixed
/// (in bytes) to keep distinct pairs on distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExamStateKey(String);

impl ExamStateKey {
    #[must_use]
    pub fn for_exam(candidate: &CandidateId, scheme: &SchemeId) -> Self {
        let candidate = candidate.as_str();
        Self(format!(
            "teori_exam_progress_{}:{candidate}_{scheme}",
            candidate.len()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExamStateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Resumable progress of a theory exam: the answers so far and the remaining
/// time budget. The total budget is never stored; it is recomputed from the
/// freshly loaded units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamState {
    answers: AnswerMap,
    time_left_seconds: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ExamStateV1 {
    version: u32,
    answers: AnswerMap,
    time_left_seconds: u32,
}

// Shape written by the unversioned browser client.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnversionedExamState {
    #[serde(default)]
    answers: AnswerMap,
    time_left: u32,
}

impl ExamState {
    #[must_use]
    pub fn new(answers: AnswerMap, time_left_seconds: u32) -> Self {
        Self {
            answers,
            time_left_seconds,
        }
    }

    /// Fresh state for a first start: no answers, the full budget left.
    #[must_use]
    pub fn started(total_duration_seconds: u32) -> Self {
        Self::new(AnswerMap::new(), total_duration_seconds)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn time_left_seconds(&self) -> u32 {
        self.time_left_seconds
    }

    #[must_use]
    pub fn into_parts(self) -> (AnswerMap, u32) {
        (self.answers, self.time_left_seconds)
    }

    /// Restrict the remaining time to `[0, total_duration_seconds]`.
    ///
    /// Units can shrink between a save and a resume; the remaining budget must
    /// never exceed what the fresh unit list allows.
    #[must_use]
    pub fn clamped_to(mut self, total_duration_seconds: u32) -> Self {
        self.time_left_seconds = self.time_left_seconds.min(total_duration_seconds);
        self
    }

    /// Serialize as the current versioned record.
    ///
    /// # Errors
    ///
    /// Returns `ExamStateError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, ExamStateError> {
        serde_json::to_string(&ExamStateV1 {
            version: EXAM_STATE_VERSION,
            answers: self.answers.clone(),
            time_left_seconds: self.time_left_seconds,
        })
        .map_err(|err| ExamStateError::Malformed(err.to_string()))
    }

    /// Decode a persisted record.
    ///
    /// Version 1 records are read strictly; unversioned records carrying
    /// `answers` and `timeLeft` are upgraded. Anything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns `ExamStateError` if the payload is not JSON, has an unknown
    /// version, or does not match a known shape.
    pub fn from_json(raw: &str) -> Result<Self, ExamStateError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|err| ExamStateError::Malformed(err.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(ExamStateError::UnknownShape);
        };

        match object.get("version") {
            Some(version) if version.as_u64() == Some(u64::from(EXAM_STATE_VERSION)) => {
                let record: ExamStateV1 =
                    serde_json::from_value(value).map_err(|_| ExamStateError::UnknownShape)?;
                Ok(Self::new(record.answers, record.time_left_seconds))
            }
            Some(version) => Err(ExamStateError::UnsupportedVersion(version.to_string())),
            None if object.contains_key("timeLeft") => {
                let record: UnversionedExamState =
                    serde_json::from_value(value).map_err(|_| ExamStateError::UnknownShape)?;
                Ok(Self::new(record.answers, record.time_left))
            }
            None => Err(ExamStateError::UnknownShape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn sample() -> ExamState {
        let mut answers = AnswerMap::new();
        answers.set(QuestionId::new("Q1"), "x");
        ExamState::new(answers, 600)
    }

    #[test]
    fn key_is_unique_per_candidate_and_scheme() {
        let key = ExamStateKey::for_exam(&CandidateId::new("c1"), &SchemeId::new("ADS"));
        assert_eq!(key.as_str(), "teori_exam_progress_2:c1_ADS");
        assert_ne!(
            key,
            ExamStateKey::for_exam(&CandidateId::new("c1"), &SchemeId::new("DS"))
        );
    }

    #[test]
    fn underscores_in_ids_do_not_collide() {
        let pairs = [("c_1", "ADS"), ("c", "1_ADS"), ("c_1_", "ADS"), ("c_1", "_ADS")];
        let keys: Vec<_> = pairs
            .iter()
            .map(|(c, s)| ExamStateKey::for_exam(&CandidateId::new(*c), &SchemeId::new(*s)))
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn writes_versioned_record() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":1,"answers":{"Q1":"x"},"timeLeftSeconds":600}"#
        );
        assert_eq!(ExamState::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn upgrades_unversioned_record() {
        let state = ExamState::from_json(r#"{"answers":{"Q1":"x"},"timeLeft":600}"#).unwrap();
        assert_eq!(state, sample());
    }

    #[test]
    fn rejects_unknown_version_and_shapes() {
        assert_eq!(
            ExamState::from_json(r#"{"version":2,"answers":{},"timeLeftSeconds":1}"#),
            Err(ExamStateError::UnsupportedVersion("2".into()))
        );
        assert_eq!(
            ExamState::from_json(r#"{"answers":{"Q1":"x"}}"#),
            Err(ExamStateError::UnknownShape)
        );
        assert_eq!(
            ExamState::from_json(r#"{"version":1,"answers":{"Q1":3},"timeLeftSeconds":1}"#),
            Err(ExamStateError::UnknownShape)
        );
        assert_eq!(
            ExamState::from_json(r#"{"timeLeft":-5}"#),
            Err(ExamStateError::UnknownShape)
        );
        assert_eq!(ExamState::from_json("[]"), Err(ExamStateError::UnknownShape));
        assert!(matches!(
            ExamState::from_json("not json"),
            Err(ExamStateError::Malformed(_))
        ));
    }

    #[test]
    fn clamp_never_raises_remaining_time() {
        assert_eq!(sample().clamped_to(300).time_left_seconds(), 300);
        assert_eq!(sample().clamped_to(2100).time_left_seconds(), 600);
    }
}
