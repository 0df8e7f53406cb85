//! Date-window resolution for health queries.
//!
//! All windows are closed intervals: both endpoints inclusive. "Now" is
//! always a value the caller captured once and threads in explicitly, so
//! a request running across midnight cannot see two different "today"s.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::HealthError;

/// Default lookback for historical views (dashboard, tracking plan).
pub const DEFAULT_HISTORY_DAYS: i64 = 30;
/// Default lookback for anomaly views.
pub const DEFAULT_ANOMALY_DAYS: i64 = 7;

/// A closed calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, HealthError> {
        if end < start {
            return Err(HealthError::InvalidRange(format!(
                "end_date {end} is before start_date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolve an optional explicit range against a captured "today".
    ///
    /// Explicit ranges are used verbatim; otherwise the window is the last
    /// `default_days` days ending today.
    pub fn resolve(
        explicit: Option<(NaiveDate, NaiveDate)>,
        today: NaiveDate,
        default_days: i64,
    ) -> Result<Self, HealthError> {
        match explicit {
            Some((start, end)) => Self::new(start, end),
            None => Self::new(today - Duration::days(default_days - 1), today),
        }
    }

    /// Number of calendar days covered, endpoints inclusive.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// All dates in the window, in order. Used for zero-filling series.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let start = self.start;
        (0..self.num_days()).map(move |i| start + Duration::days(i))
    }
}

/// The "realtime" window rule.
///
/// Mornings (local hour < 12) cover {yesterday, today} so a cumulative
/// read is not cut off at the midnight boundary; from 12:00 local the
/// window narrows to {today} only. Both boundaries derive from the single
/// `now_local` instant the caller captured.
pub fn realtime_window(now_local: NaiveDateTime) -> DateWindow {
    let today = now_local.date();
    let start = if now_local.hour() < 12 {
        today - Duration::days(1)
    } else {
        today
    };
    DateWindow { start, end: today }
}
