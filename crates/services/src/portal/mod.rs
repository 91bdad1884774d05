//! Boundaries to the portal backend: eligibility lookup, the question bank and
//! the submission sink.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use exam_core::model::{
    AnswerMap, CandidateId, EligibilityRecord, Question, QuestionCategory, SchemeId, Unit, UnitId,
};

pub use crate::error::PortalError;
pub use http::PortalClient;
pub use memory::InMemoryPortal;

/// Acknowledgement returned by the grading backend for a submitted answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submission_id: String,
}

/// Theory-exam status lookup for a candidate.
#[async_trait]
pub trait EligibilityLookup: Send + Sync {
    /// Fetch the candidate's theory-exam status.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the lookup fails or returns an unexpected shape.
    async fn exam_status(&self, candidate: &CandidateId) -> Result<EligibilityRecord, PortalError>;
}

/// Read access to the scheme's units and their questions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Units of a scheme, in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the fetch fails.
    async fn units_for_scheme(&self, scheme: &SchemeId) -> Result<Vec<Unit>, PortalError>;

    /// Questions of one unit in the given category, in bank order.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the fetch fails.
    async fn questions_for_unit(
        &self,
        unit: &UnitId,
        category: QuestionCategory,
    ) -> Result<Vec<Question>, PortalError>;
}

/// Accepts a finished theory answer set for grading.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Hand the final answers over for grading.
    ///
    /// # Errors
    ///
    /// Returns `PortalError` if the backend rejects or cannot be reached.
    async fn submit_theory(
        &self,
        candidate: &CandidateId,
        answers: &AnswerMap,
    ) -> Result<SubmissionReceipt, PortalError>;
}
