//! Calendar-aligned period boundaries in UTC.
//!
//! Boundaries come from the timestamp's own year/month/day/weekday, never
//! from formatted week numbers, so weeks straddling New Year resolve to the
//! same Monday regardless of which year a given day belongs to.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::SensorDataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodType {
    pub const ALL: [PeriodType; 3] = [PeriodType::Daily, PeriodType::Weekly, PeriodType::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
        }
    }

    /// First calendar date of the period containing `date`.
    fn first_day(&self, date: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => date,
            PeriodType::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            PeriodType::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// First calendar date of the period following the one starting at `first`.
    fn next_first_day(&self, first: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => first.succ_opt().unwrap_or(NaiveDate::MAX),
            PeriodType::Weekly => first.checked_add_signed(Duration::days(7)).unwrap_or(NaiveDate::MAX),
            PeriodType::Monthly => {
                let (year, month) = if first.month() == 12 {
                    (first.year() + 1, 1)
                } else {
                    (first.year(), first.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
            }
        }
    }

    /// The inclusive `[start, end]` of the period containing `ts`.
    ///
    /// `end` is the last representable instant before the next period
    /// begins, so it renders as `23:59:59` and still covers sub-second
    /// readings.
    pub fn boundaries_for(&self, ts: DateTime<Utc>) -> PeriodBounds {
        let first = self.first_day(ts.date_naive());
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let next_start = self.next_first_day(first).and_time(NaiveTime::MIN).and_utc();
        PeriodBounds {
            start,
            end: next_start - Duration::nanoseconds(1),
        }
    }
}

impl Display for PeriodType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = SensorDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeriodType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SensorDataError::InvalidPeriod(s.to_string()))
    }
}

/// Inclusive calendar bounds of one period. `start` doubles as the bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodBounds {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}
