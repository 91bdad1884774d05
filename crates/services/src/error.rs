//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{QuestionSetError, SessionPhase, UnitId};
use storage::sqlite::SqliteInitError;

/// Errors emitted by the portal collaborators (eligibility, question bank,
/// submission sink).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PortalError {
    #[error("portal request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("portal base URL cannot carry a path: {0}")]
    InvalidBaseUrl(String),
    #[error("portal unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `QuestionSetLoader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to fetch units: {0}")]
    Units(#[source] PortalError),
    #[error("failed to fetch questions for unit {unit}: {source}")]
    Questions {
        unit: UnitId,
        #[source]
        source: PortalError,
    },
    #[error(transparent)]
    Empty(#[from] QuestionSetError),
}

/// Errors emitted by the presentation-mode backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationError {
    #[error("exclusive presentation was refused: {0}")]
    Refused(String),
}

/// Errors emitted by `ExamSessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("action not allowed while {0}")]
    InvalidPhase(SessionPhase),
    #[error("no question is selected")]
    NoQuestion,
    #[error(transparent)]
    Presentation(#[from] PresentationError),
    #[error("submission failed: {0}")]
    Submission(#[source] PortalError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("EXAM_PORTAL_URL is not set")]
    MissingPortalUrl,
    #[error("invalid portal URL: {raw}")]
    InvalidUrl { raw: String },
    #[error("invalid date check mode (expected strict or lenient): {raw}")]
    InvalidDateCheck { raw: String },
    #[error("invalid UTC offset (expected +HH:MM): {raw}")]
    InvalidOffset { raw: String },
    #[error("invalid value for {key}: {raw}")]
    InvalidNumber { key: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
