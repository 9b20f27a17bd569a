//! # Temporal Types
//!
//! Day-granularity reservation intervals, UTC timestamps, and the clock
//! abstraction used wherever the stack needs "now" or "today".
//!
//! ## Half-Open Ranges
//!
//! A [`DateRange`] covers `[start, end)`: the `end` day is excluded, so a
//! range ending on the 15th and a range starting on the 15th do not
//! overlap. Construction rejects `start >= end`, which means every
//! `DateRange` in the system covers at least one day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// A UTC timestamp.
///
/// Serializes to ISO 8601 with a `Z` suffix. Used for approval dates,
/// record bookkeeping, and token expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The calendar day (UTC) this timestamp falls on.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// ISO 8601 string with `Z` suffix, truncated to seconds.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;

    /// The current UTC calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock pinned to one instant. Test and replay use.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    /// Pin the clock to the given instant.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Timestamp::from_datetime(at))
    }

    /// Pin the clock to midday UTC on the given day.
    pub fn on_day(day: NaiveDate) -> Self {
        let at = day
            .and_hms_opt(12, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// A half-open interval of calendar days, `[start, end)`.
///
/// Invariant: `start < end`. Deserialization enforces it as well, so a
/// persisted or submitted range can never be empty or inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Build a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings into a range.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    /// First day covered.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day no longer covered.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered. Always at least one.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Strict half-open overlap test. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Whether the range begins on or after `today`.
    pub fn starts_on_or_after(&self, today: NaiveDate) -> bool {
        self.start >= today
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn range(s: u32, e: u32) -> DateRange {
        DateRange::new(day(s), day(e)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted() {
        assert!(DateRange::new(day(10), day(10)).is_err());
        assert!(DateRange::new(day(12), day(10)).is_err());
    }

    #[test]
    fn days_counts_exclusive_end() {
        assert_eq!(range(10, 15).days(), 5);
        assert_eq!(range(10, 11).days(), 1);
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        assert!(!range(10, 15).overlaps(&range(15, 20)));
        assert!(!range(15, 20).overlaps(&range(10, 15)));
    }

    #[test]
    fn nested_and_partial_ranges_overlap() {
        assert!(range(10, 15).overlaps(&range(12, 13)));
        assert!(range(10, 15).overlaps(&range(12, 18)));
        assert!(range(12, 18).overlaps(&range(10, 15)));
        assert!(range(10, 15).overlaps(&range(10, 15)));
    }

    #[test]
    fn contains_is_half_open() {
        let r = range(10, 15);
        assert!(r.contains(day(10)));
        assert!(r.contains(day(14)));
        assert!(!r.contains(day(15)));
        assert!(!r.contains(day(9)));
    }

    #[test]
    fn parse_accepts_iso_days() {
        let r = DateRange::parse("2026-05-10", "2026-05-15").unwrap();
        assert_eq!(r, range(10, 15));
    }

    #[test]
    fn parse_rejects_bad_day() {
        let err = DateRange::parse("2026-13-01", "2026-05-15").unwrap_err();
        assert_eq!(err, ValidationError::InvalidDate("2026-13-01".to_string()));
    }

    #[test]
    fn deserialize_enforces_invariant() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start":"2026-05-10","end":"2026-05-15"}"#).unwrap();
        assert_eq!(ok, range(10, 15));
        let bad: Result<DateRange, _> =
            serde_json::from_str(r#"{"start":"2026-05-15","end":"2026-05-15"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn starts_on_or_after_today() {
        assert!(range(10, 15).starts_on_or_after(day(10)));
        assert!(!range(10, 15).starts_on_or_after(day(11)));
    }

    #[test]
    fn fixed_clock_today() {
        let clock = FixedClock::on_day(day(7));
        assert_eq!(clock.today(), day(7));
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn timestamp_canonical_string() {
        let ts = FixedClock::on_day(day(7)).now();
        assert_eq!(ts.to_canonical_string(), "2026-05-07T12:00:00Z");
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 1u32..28, la in 1u32..5, b in 1u32..28, lb in 1u32..5) {
            let x = DateRange::new(day(a), day(a) + chrono::Duration::days(la as i64)).unwrap();
            let y = DateRange::new(day(b), day(b) + chrono::Duration::days(lb as i64)).unwrap();
            prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
        }

        #[test]
        fn overlap_iff_shared_day(a in 1u32..28, la in 1u32..5, b in 1u32..28, lb in 1u32..5) {
            let x = DateRange::new(day(a), day(a) + chrono::Duration::days(la as i64)).unwrap();
            let y = DateRange::new(day(b), day(b) + chrono::Duration::days(lb as i64)).unwrap();
            let shared = x.start().iter_days().take_while(|d| *d < x.end()).any(|d| y.contains(d));
            prop_assert_eq!(x.overlaps(&y), shared);
        }
    }
}
