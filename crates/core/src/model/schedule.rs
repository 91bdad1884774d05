use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("invalid schedule date: {0}")]
    InvalidDate(String),
}

/// Parse a scheduled exam date at day granularity.
///
/// Accepts a plain `YYYY-MM-DD` date, an RFC 3339 timestamp (the calendar date
/// in the timestamp's own offset is kept) or a naive `YYYY-MM-DDTHH:MM:SS`.
///
/// # Errors
///
/// Returns `ScheduleError::InvalidDate` if none of the formats match.
pub fn parse_schedule_date(raw: &str) -> Result<NaiveDate, ScheduleError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.date_naive());
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(stamp.date());
    }
    Err(ScheduleError::InvalidDate(raw.to_string()))
}

fn deserialize_schedule_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_schedule_date(&raw).map_err(serde::de::Error::custom)
}

/// Assigned exam session, shown to the candidate before the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    #[serde(alias = "tanggal", deserialize_with = "deserialize_schedule_date")]
    pub date: NaiveDate,
    #[serde(alias = "waktu")]
    pub time: String,
    #[serde(alias = "ruangan")]
    pub room: String,
}

/// Theory-exam status of a candidate as reported by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRecord {
    pub prerequisite_met: bool,
    pub scheduled: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub schedule: Option<ScheduleInfo>,
}
