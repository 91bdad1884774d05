use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use exam_core::model::{CandidateId, EligibilityRecord, ScheduleInfo};

use crate::Clock;
use crate::error::ConfigError;
use crate::portal::EligibilityLookup;

/// Western Indonesia Time, the default venue offset.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[must_use]
pub fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// How strictly the scheduled exam day is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateCheck {
    /// Only the scheduled day is accepted.
    #[default]
    Strict,
    /// A day mismatch is logged and let through (development setups).
    Lenient,
}

impl FromStr for DateCheck {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(ConfigError::InvalidDateCheck { raw: s.to_string() }),
        }
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Why a candidate may not sit the theory exam now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Prerequisite,
    NotScheduled,
    /// Scheduled, but the schedule record itself is missing.
    ScheduleMissing,
    AlreadyCompleted,
    WrongDay {
        scheduled: NaiveDate,
        today: NaiveDate,
    },
    VerificationFailed,
}

impl Denial {
    /// Stable reason code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Prerequisite => "prerequisite",
            Denial::NotScheduled => "not scheduled",
            Denial::ScheduleMissing => "schedule missing",
            Denial::AlreadyCompleted => "already completed",
            Denial::WrongDay { .. } => "wrong day",
            Denial::VerificationFailed => "verification failed",
        }
    }

    /// Candidate-facing explanation.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Denial::Prerequisite => {
                "Anda belum memenuhi prasyarat (menyelesaikan Tryout) untuk ujian ini.".into()
            }
            Denial::NotScheduled => "Ujian Teori Anda belum dijadwalkan oleh Admin.".into(),
            Denial::ScheduleMissing => "Jadwal ujian tidak ditemukan (Error: ST-JNF).".into(),
            Denial::AlreadyCompleted => "Anda telah menyelesaikan Ujian Teori.".into(),
            Denial::WrongDay { scheduled, .. } => format!(
                "Ujian ini hanya bisa diakses pada {}.",
                scheduled.format("%d-%m-%Y")
            ),
            Denial::VerificationFailed => "Gagal memverifikasi status ujian Anda.".into(),
        }
    }

    /// True for denials caused by inconsistent backend data rather than by the
    /// candidate's situation.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Denial::ScheduleMissing | Denial::VerificationFailed)
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Approved(ScheduleInfo),
    Denied(Denial),
}

//
// ─── GATE ──────────────────────────────────────────────────────────────────────
//

/// Decides, before any exam state is touched, whether a candidate may sit the
/// theory exam today.
#[derive(Clone)]
pub struct EligibilityGate {
    clock: Clock,
    lookup: Arc<dyn EligibilityLookup>,
    date_check: DateCheck,
    utc_offset: FixedOffset,
}

impl EligibilityGate {
    #[must_use]
    pub fn new(clock: Clock, lookup: Arc<dyn EligibilityLookup>) -> Self {
        Self {
            clock,
            lookup,
            date_check: DateCheck::Strict,
            utc_offset: default_utc_offset(),
        }
    }

    #[must_use]
    pub fn with_date_check(mut self, date_check: DateCheck) -> Self {
        self.date_check = date_check;
        self
    }

    #[must_use]
    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    #[must_use]
    pub fn date_check(&self) -> DateCheck {
        self.date_check
    }

    /// Look the candidate up and decide. A failed lookup is a denial.
    pub async fn check(&self, candidate: &CandidateId) -> Eligibility {
        let outcome = match self.lookup.exam_status(candidate).await {
            Ok(record) => self.decide(&record),
            Err(err) => {
                warn!(%candidate, error = %err, "eligibility lookup failed");
                Eligibility::Denied(Denial::VerificationFailed)
            }
        };
        match &outcome {
            Eligibility::Approved(schedule) => {
                info!(%candidate, date = %schedule.date, room = %schedule.room, "eligibility approved");
            }
            Eligibility::Denied(denial) => {
                info!(%candidate, reason = denial.reason(), "eligibility denied");
            }
        }
        outcome
    }

    /// Apply the denial rules, in priority order, to a fetched record.
    #[must_use]
    pub fn decide(&self, record: &EligibilityRecord) -> Eligibility {
        if !record.prerequisite_met {
            return Eligibility::Denied(Denial::Prerequisite);
        }
        if !record.scheduled {
            return Eligibility::Denied(Denial::NotScheduled);
        }
        let Some(schedule) = record.schedule.as_ref() else {
            return Eligibility::Denied(Denial::ScheduleMissing);
        };
        if record.completed {
            return Eligibility::Denied(Denial::AlreadyCompleted);
        }

        let today = self.clock.today(self.utc_offset);
        if schedule.date != today {
            match self.date_check {
                DateCheck::Strict => {
                    return Eligibility::Denied(Denial::WrongDay {
                        scheduled: schedule.date,
                        today,
                    });
                }
                DateCheck::Lenient => {
                    warn!(scheduled = %schedule.date, %today, "exam day mismatch ignored (lenient date check)");
                }
            }
        }

        Eligibility::Approved(schedule.clone())
    }
}
