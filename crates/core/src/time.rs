use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Calendar date of the current instant as seen from `offset`.
    ///
    /// Exam days are decided in the venue's local time, so two instants that
    /// fall on the same local day compare equal regardless of time-of-day.
    #[must_use]
    pub fn today(&self, offset: FixedOffset) -> NaiveDate {
        self.now().with_timezone(&offset).date_naive()
    }
}
