//! Resolution of request filters into a concrete `created_at` interval.
//!
//! Both bounds are inclusive (`created_at >= after`, `created_at <= before`)
//! and either may be open. Unparseable filters resolve to an open bound.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::warn;
use std::str::FromStr;

use crate::error::SensorDataError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn unbounded() -> Self {
        TimeRange::default()
    }

    /// Resolve `after`/`before` query strings. Absent or malformed values
    /// become open bounds; malformed ones are logged, never rejected.
    pub fn resolve(after: Option<&str>, before: Option<&str>) -> Self {
        TimeRange {
            after: resolve_bound("after", after),
            before: resolve_bound("before", before),
        }
    }

    /// The interval covered by a trailing window ending at `now`. Only the
    /// lower bound is set; readings newer than `now` are not excluded.
    pub fn trailing(window: TrailingWindow, now: DateTime<Utc>) -> Self {
        TimeRange {
            after: window.start(now),
            ..TimeRange::unbounded()
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.after.is_none_or(|after| ts >= after) && self.before.is_none_or(|before| ts <= before)
    }
}

fn resolve_bound(name: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_iso8601(raw);
    if parsed.is_none() {
        warn!("Ignoring unparseable '{}' filter: {:?}", name, raw);
    }
    parsed
}

/// Parse an ISO-8601 timestamp. Accepts RFC 3339 with any offset, a
/// date-time without offset (taken as UTC) and a bare date (midnight UTC).
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// A window relative to "now", as opposed to a calendar-aligned period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TrailingWindow {
    pub const ALL: [TrailingWindow; 5] = [
        TrailingWindow::Day,
        TrailingWindow::Week,
        TrailingWindow::Month,
        TrailingWindow::Year,
        TrailingWindow::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrailingWindow::Day => "day",
            TrailingWindow::Week => "week",
            TrailingWindow::Month => "month",
            TrailingWindow::Year => "year",
            TrailingWindow::All => "all",
        }
    }

    /// Fixed-length look-back: a "month" is 30 days and a "year" 365 days.
    pub fn length(&self) -> Option<Duration> {
        match self {
            TrailingWindow::Day => Some(Duration::hours(24)),
            TrailingWindow::Week => Some(Duration::days(7)),
            TrailingWindow::Month => Some(Duration::days(30)),
            TrailingWindow::Year => Some(Duration::days(365)),
            TrailingWindow::All => None,
        }
    }

    /// Inclusive lower bound of the window, `None` for `all`.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.length().map(|len| now - len)
    }
}

impl FromStr for TrailingWindow {
    type Err = SensorDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrailingWindow::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| SensorDataError::InvalidPeriod(s.to_string()))
    }
}
