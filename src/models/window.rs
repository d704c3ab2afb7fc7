//! Time window model.
//!
//! # Time Model
//! All timestamps are UTC. Intervals are half-open: `[start, end)` includes
//! `start` and excludes `end`, so two appointments where one ends exactly
//! when the other starts do not overlap.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// A time interval [start, end).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: DateTime<Utc>,
    /// Interval end (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window without checking ordering.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a time window, rejecting empty or inverted intervals.
    pub fn checked(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(DispatchError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The 24 hours of a calendar day, midnight to midnight UTC.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self::new(start, start + Duration::days(1))
    }

    /// Duration of this window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Duration in whole minutes.
    #[inline]
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Clamps a timestamp into `[start, end]`.
    pub fn clamp(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        t.max(self.start).min(self.end)
    }

    /// Overlap with another window, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            Some(Self::new(start, end))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(at(9, 0), at(10, 0));
        assert_eq!(w.duration_minutes(), 60);
        assert!(w.contains(at(9, 0)));
        assert!(w.contains(at(9, 59)));
        assert!(!w.contains(at(10, 0))); // exclusive end
        assert!(!w.contains(at(8, 30)));
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(at(9, 0), at(10, 0));
        let b = TimeWindow::new(at(9, 30), at(10, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(at(10, 0), at(11, 0)); // touching but not overlapping
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_checked_rejects_inverted() {
        assert!(TimeWindow::checked(at(10, 0), at(9, 0)).is_err());
        assert!(TimeWindow::checked(at(10, 0), at(10, 0)).is_err());
        assert!(TimeWindow::checked(at(9, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn test_day_window() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let w = TimeWindow::day(date);
        assert_eq!(w.start, at(0, 0));
        assert_eq!(w.duration(), Duration::hours(24));
    }

    #[test]
    fn test_clamp() {
        let w = TimeWindow::new(at(8, 0), at(18, 0));
        assert_eq!(w.clamp(at(7, 0)), at(8, 0));
        assert_eq!(w.clamp(at(12, 0)), at(12, 0));
        assert_eq!(w.clamp(at(19, 0)), at(18, 0));
    }

    #[test]
    fn test_intersection() {
        let w = TimeWindow::new(at(8, 0), at(12, 0));
        let i = w.intersection(&TimeWindow::new(at(11, 0), at(13, 0))).unwrap();
        assert_eq!(i, TimeWindow::new(at(11, 0), at(12, 0)));
        assert!(w.intersection(&TimeWindow::new(at(12, 0), at(13, 0))).is_none());
    }
}
