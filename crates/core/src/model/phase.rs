use std::fmt;

/// Lifecycle phase of a theory-exam session.
///
/// `CheckingEligibility → Denied`
/// `CheckingEligibility → Loading → NotStarted | Active | LoadFailed`
/// `NotStarted → Active ⇄ PausedIntegrity`
/// `Active → Submitting → Submitted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    CheckingEligibility,
    Denied,
    Loading,
    LoadFailed,
    NotStarted,
    Active,
    PausedIntegrity,
    Submitting,
    Submitted,
}

impl SessionPhase {
    /// Phases in which the candidate may edit answers and the clock runs.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Active)
    }

    /// Phases after which the controller accepts no further input.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Denied | SessionPhase::Submitted)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::CheckingEligibility => "CHECKING_ELIGIBILITY",
            SessionPhase::Denied => "DENIED",
            SessionPhase::Loading => "LOADING",
            SessionPhase::LoadFailed => "LOAD_FAILED",
            SessionPhase::NotStarted => "NOT_STARTED",
            SessionPhase::Active => "ACTIVE",
            SessionPhase::PausedIntegrity => "PAUSED_INTEGRITY",
            SessionPhase::Submitting => "SUBMITTING",
            SessionPhase::Submitted => "SUBMITTED",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_denied_and_submitted_are_terminal() {
        assert!(SessionPhase::Denied.is_terminal());
        assert!(SessionPhase::Submitted.is_terminal());
        assert!(!SessionPhase::Submitting.is_terminal());
        assert!(!SessionPhase::LoadFailed.is_terminal());
        assert_eq!(SessionPhase::PausedIntegrity.to_string(), "PAUSED_INTEGRITY");
    }
}
