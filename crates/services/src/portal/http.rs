use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use exam_core::model::{
    AnswerMap, CandidateId, EligibilityRecord, Question, QuestionCategory, SchemeId, Unit, UnitId,
};

use super::{EligibilityLookup, PortalError, QuestionBank, SubmissionReceipt, SubmissionSink};

/// JSON-over-HTTP client for the portal backend.
#[derive(Clone, Debug)]
pub struct PortalClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    answers: &'a AnswerMap,
}

impl PortalClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PortalError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| PortalError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PortalError> {
        debug!(%url, "portal GET");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PortalError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EligibilityLookup for PortalClient {
    async fn exam_status(&self, candidate: &CandidateId) -> Result<EligibilityRecord, PortalError> {
        let url = self.endpoint(&["candidates", candidate.as_str(), "exam-status"])?;
        self.get_json(url).await
    }
}

#[async_trait]
impl QuestionBank for PortalClient {
    async fn units_for_scheme(&self, scheme: &SchemeId) -> Result<Vec<Unit>, PortalError> {
        let url = self.endpoint(&["schemes", scheme.as_str(), "units"])?;
        self.get_json(url).await
    }

    async fn questions_for_unit(
        &self,
        unit: &UnitId,
        category: QuestionCategory,
    ) -> Result<Vec<Question>, PortalError> {
        let mut url = self.endpoint(&["units", unit.as_str(), "questions"])?;
        url.query_pairs_mut()
            .append_pair("category", category.as_str());
        self.get_json(url).await
    }
}

#[async_trait]
impl SubmissionSink for PortalClient {
    async fn submit_theory(
        &self,
        candidate: &CandidateId,
        answers: &AnswerMap,
    ) -> Result<SubmissionReceipt, PortalError> {
        let url = self.endpoint(&["candidates", candidate.as_str(), "theory-submissions"])?;
        debug!(%url, answers = answers.len(), "portal POST submission");
        let response = self
            .client
            .post(url)
            .json(&SubmissionRequest { answers })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PortalError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}
