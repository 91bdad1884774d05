use std::sync::Arc;

use exam_core::model::{CandidateId, SchemeId};
use storage::repository::Storage;

use crate::Clock;
use crate::config::ExamConfig;
use crate::eligibility::EligibilityGate;
use crate::error::AppServicesError;
use crate::exam::{ControllerDeps, ExamSessionController};
use crate::fullscreen::PresentationMode;
use crate::loader::QuestionSetLoader;
use crate::portal::{EligibilityLookup, InMemoryPortal, PortalClient, QuestionBank, SubmissionSink};

/// Assembles the exam's collaborators and hands out controllers.
#[derive(Clone)]
pub struct AppServices {
    config: ExamConfig,
    clock: Clock,
    storage: Storage,
    lookup: Arc<dyn EligibilityLookup>,
    bank: Arc<dyn QuestionBank>,
    sink: Arc<dyn SubmissionSink>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP portal.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the portal URL is missing or storage
    /// initialization fails.
    pub async fn from_config(config: ExamConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let portal = Arc::new(PortalClient::new(config.require_portal_url()?.clone()));
        let storage = Storage::sqlite(&config.db_url).await?;
        Ok(Self {
            config,
            clock,
            storage,
            lookup: portal.clone(),
            bank: portal.clone(),
            sink: portal,
        })
    }

    /// Build services over an in-memory portal and in-memory storage.
    #[must_use]
    pub fn in_memory(config: ExamConfig, clock: Clock, portal: InMemoryPortal) -> Self {
        let portal = Arc::new(portal);
        Self {
            config,
            clock,
            storage: Storage::in_memory(),
            lookup: portal.clone(),
            bank: portal.clone(),
            sink: portal,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn gate(&self) -> EligibilityGate {
        EligibilityGate::new(self.clock, Arc::clone(&self.lookup))
            .with_date_check(self.config.date_check)
            .with_utc_offset(self.config.utc_offset)
    }

    #[must_use]
    pub fn loader(&self) -> QuestionSetLoader {
        QuestionSetLoader::new(Arc::clone(&self.bank))
    }

    /// A fresh controller for one candidate's exam on this page.
    #[must_use]
    pub fn controller(
        &self,
        candidate: CandidateId,
        scheme: SchemeId,
        presentation: Arc<dyn PresentationMode>,
    ) -> ExamSessionController {
        let deps = ControllerDeps {
            gate: self.gate(),
            loader: self.loader(),
            sink: Arc::clone(&self.sink),
            store: Arc::clone(&self.storage.exam_states),
            presentation,
        };
        ExamSessionController::new(candidate, scheme, deps)
            .with_persist_warn_after(self.config.persist_warn_after)
    }
}
