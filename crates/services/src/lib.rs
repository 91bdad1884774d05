#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod exam;
pub mod fullscreen;
pub mod loader;
pub mod portal;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use config::ExamConfig;
pub use eligibility::{DateCheck, Denial, Eligibility, EligibilityGate};
pub use error::{AppServicesError, ConfigError, ExamError, LoadError, PortalError, PresentationError};
pub use exam::{
    ControllerDeps, ExamEvent, ExamEventKind, ExamSessionController, QuestionMarker, SubmitPrompt,
};
pub use fullscreen::{FullscreenGuard, PresentationChange, PresentationMode, SimulatedPresentation};
pub use loader::QuestionSetLoader;
pub use portal::{
    EligibilityLookup, InMemoryPortal, PortalClient, QuestionBank, SubmissionReceipt,
    SubmissionSink,
};
