use chrono::FixedOffset;
use std::env;
use url::Url;

use crate::eligibility::{DateCheck, default_utc_offset};
use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";
pub const DEFAULT_PERSIST_WARN_AFTER: u32 = 3;

/// Runtime configuration for the exam session, read from `EXAM_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamConfig {
    pub portal_url: Option<Url>,
    pub db_url: String,
    pub date_check: DateCheck,
    pub utc_offset: FixedOffset,
    /// Consecutive failed saves before the candidate is told resuming may not
    /// work.
    pub persist_warn_after: u32,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            portal_url: None,
            db_url: DEFAULT_DB_URL.into(),
            date_check: DateCheck::Strict,
            utc_offset: default_utc_offset(),
            persist_warn_after: DEFAULT_PERSIST_WARN_AFTER,
        }
    }
}

impl ExamConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset or blank keys use defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("EXAM_PORTAL_URL") {
            config.portal_url = Some(parse_url(&raw)?);
        }
        if let Some(raw) = get("EXAM_DB_URL") {
            config.db_url = raw.trim().to_string();
        }
        if let Some(raw) = get("EXAM_DATE_CHECK") {
            config.date_check = raw.parse()?;
        }
        if let Some(raw) = get("EXAM_UTC_OFFSET") {
            config.utc_offset = parse_utc_offset(&raw)?;
        }
        if let Some(raw) = get("EXAM_PERSIST_WARN_AFTER") {
            config.persist_warn_after = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    key: "EXAM_PERSIST_WARN_AFTER",
                    raw,
                })?;
        }
        Ok(config)
    }

    /// The portal URL, which a live session cannot run without.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingPortalUrl` if none was configured.
    pub fn require_portal_url(&self) -> Result<&Url, ConfigError> {
        self.portal_url.as_ref().ok_or(ConfigError::MissingPortalUrl)
    }
}

/// Parse a portal base URL; only http(s) is accepted.
///
/// # Errors
///
/// Returns `ConfigError::InvalidUrl` for anything else.
pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        raw: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

/// Parse `+HH:MM` / `-HH:MM` (also `Z`).
///
/// # Errors
///
/// Returns `ConfigError::InvalidOffset` if the value is malformed or out of
/// range.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset {
        raw: raw.to_string(),
    };
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ExamConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ExamConfig::default());
        assert_eq!(config.utc_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(
            config.require_portal_url().unwrap_err(),
            ConfigError::MissingPortalUrl
        );
    }

    #[test]
    fn reads_every_key() {
        let config = ExamConfig::from_lookup(lookup(&[
            ("EXAM_PORTAL_URL", "https://portal.test/api/"),
            ("EXAM_DB_URL", "sqlite::memory:"),
            ("EXAM_DATE_CHECK", "lenient"),
            ("EXAM_UTC_OFFSET", "+08:00"),
            ("EXAM_PERSIST_WARN_AFTER", "5"),
        ]))
        .unwrap();

        assert_eq!(
            config.require_portal_url().unwrap().as_str(),
            "https://portal.test/api/"
        );
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.date_check, DateCheck::Lenient);
        assert_eq!(config.utc_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.persist_warn_after, 5);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = ExamConfig::from_lookup(lookup(&[("EXAM_DB_URL", "  ")])).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ExamConfig::from_lookup(lookup(&[("EXAM_PORTAL_URL", "ftp://x")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ExamConfig::from_lookup(lookup(&[("EXAM_PERSIST_WARN_AFTER", "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            ExamConfig::from_lookup(lookup(&[("EXAM_DATE_CHECK", "never")])),
            Err(ConfigError::InvalidDateCheck { .. })
        ));
    }

    #[test]
    fn offsets_parse_with_sign() {
        assert_eq!(parse_utc_offset("-05:30").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        for bad in ["07:00", "+7:00", "+15:00", "+07:60", "+0700"] {
            assert!(parse_utc_offset(bad).is_err(), "{bad}");
        }
    }
}
