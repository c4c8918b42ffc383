//! Injected date source for registration stamps and day-scoped queries.
//!
//! # Responsibility
//! - Decouple "the current date" from ambient system time so that patient
//!   registration and the daily consultation count are deterministic under
//!   test.

use chrono::NaiveDate;

/// Capability providing the current civil date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to one date. Used by tests and replay tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock};
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_returns_pinned_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        assert_eq!(FixedClock(date).today(), date);
    }
}
