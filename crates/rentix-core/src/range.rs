//! # Rental Date Ranges
//!
//! A rental covers whole days, `start` and `end` both inclusive.
//!
//! ## Overlap Predicate
//! ```text
//! [s1, e1] and [s2, e2] overlap  ⇔  s1 <= e2 AND s2 <= e1
//!
//!   A: ├──────────┤                 overlap
//!   B:            ├──────┤          (touching on the return day counts)
//!
//!   A: ├─────┤
//!   B:         ├──────┤             no overlap
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::MAX_DURATION_DAYS;

/// An inclusive date range. Constructed through [`DateRange::new`] for
/// bookings, which rejects `start >= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    start: NaiveDate,
    #[ts(as = "String")]
    end: NaiveDate,
}

impl DateRange {
    /// Creates a booking range. `start` must be strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start >= end {
            return Err(CoreError::invalid_range(format!(
                "start {} must be before end {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Creates a range `duration_days` long starting at `start`.
    pub fn from_duration(start: NaiveDate, duration_days: i64) -> CoreResult<Self> {
        if duration_days <= 0 {
            return Err(CoreError::invalid_range("duration must be at least one day"));
        }
        if duration_days > MAX_DURATION_DAYS {
            return Err(CoreError::invalid_range(format!(
                "duration {} exceeds {} days",
                duration_days, MAX_DURATION_DAYS
            )));
        }
        let end = start
            .checked_add_signed(Duration::days(duration_days))
            .ok_or_else(|| CoreError::invalid_range("end date out of range"))?;
        DateRange::new(start, end)
    }

    /// A single-day range, used for derived "status today" queries.
    pub fn single_day(day: NaiveDate) -> Self {
        DateRange { start: day, end: day }
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days between start and end (the billed duration).
    #[inline]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Inclusive overlap test.
    #[inline]
    pub fn overlaps(&self, other: &DateRange) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }
}

/// The single overlap predicate used everywhere in the crate.
#[inline]
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_and_empty() {
        assert!(DateRange::new(d(5), d(4)).is_err());
        assert!(DateRange::new(d(5), d(5)).is_err());
        assert!(DateRange::new(d(5), d(6)).is_ok());
    }

    #[test]
    fn test_from_duration() {
        let range = DateRange::from_duration(d(10), 3).unwrap();
        assert_eq!(range.end(), d(13));
        assert_eq!(range.days(), 3);

        assert!(DateRange::from_duration(d(10), 0).is_err());
        assert!(DateRange::from_duration(d(10), -2).is_err());
        assert!(DateRange::from_duration(d(10), MAX_DURATION_DAYS + 1).is_err());
    }

    #[test]
    fn test_touching_endpoints_overlap() {
        let a = DateRange::new(d(1), d(3)).unwrap();
        let b = DateRange::new(d(3), d(5)).unwrap();
        let c = DateRange::new(d(4), d(6)).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_containment_overlaps_both_ways() {
        let outer = DateRange::new(d(1), d(20)).unwrap();
        let inner = DateRange::new(d(5), d(6)).unwrap();
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }
}
