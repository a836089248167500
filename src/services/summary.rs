//! Period summaries: bucket readings into calendar periods and fold each
//! bucket into `{average, min, max, count}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::db::models::SensorReading;
use crate::db::store::SensorStore;
use crate::error::SensorDataError;
use crate::pagination::Pagination;
use crate::period::{PeriodBounds, PeriodType};
use crate::services::query::require_sensor_code;
use crate::time_range::{TimeRange, TrailingWindow};
use crate::utils::{iso8601, round_to};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    #[serde(serialize_with = "iso8601::serialize_secs")]
    pub period_start: DateTime<Utc>,
    #[serde(serialize_with = "iso8601::serialize_secs")]
    pub period_end: DateTime<Utc>,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: i64,
}

struct PeriodAccumulator {
    bounds: PeriodBounds,
    count: i64,
    numeric_count: i64,
    /// Running mean; a plain sum overflows to infinity for large finite values.
    mean: f64,
    min: Option<f64>,
    max: Option<f64>,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl PeriodAccumulator {
    fn new(bounds: PeriodBounds, seen: DateTime<Utc>) -> Self {
        PeriodAccumulator {
            bounds,
            count: 0,
            numeric_count: 0,
            mean: 0.0,
            min: None,
            max: None,
            first_seen: seen,
            last_seen: seen,
        }
    }

    fn add(&mut self, reading: &SensorReading) {
        self.count += 1;
        self.first_seen = self.first_seen.min(reading.created_at);
        self.last_seen = self.last_seen.max(reading.created_at);

        // non-numeric readings still count
        let Some(value) = reading.numeric_value() else {
            return;
        };
        self.numeric_count += 1;
        let n = self.numeric_count as f64;
        self.mean += value / n - self.mean / n;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn into_summary(self) -> PeriodSummary {
        debug!(
            "Summary: bucket {} holds {} reading(s) seen {}..{}",
            iso8601::format_secs(&self.bounds.start),
            self.count,
            iso8601::format_millis(&self.first_seen),
            iso8601::format_millis(&self.last_seen)
        );
        let average = (self.numeric_count > 0).then(|| round_to(self.mean, 2));
        PeriodSummary {
            period_start: self.bounds.start,
            period_end: self.bounds.end,
            average,
            min: self.min,
            max: self.max,
            count: self.count,
        }
    }
}

/// Group `rows` by the `period` containing each reading's `created_at` and
/// summarise every non-empty group, most recent period first.
///
/// Reported boundaries are the full calendar period, not the extent of the
/// data inside it. Empty periods are never emitted.
pub fn aggregate(rows: &[SensorReading], period: PeriodType) -> Vec<PeriodSummary> {
    let mut buckets: BTreeMap<DateTime<Utc>, PeriodAccumulator> = BTreeMap::new();
    for row in rows {
        let bounds = period.boundaries_for(row.created_at);
        debug_assert!(bounds.contains(row.created_at));
        buckets
            .entry(bounds.start)
            .or_insert_with(|| PeriodAccumulator::new(bounds, row.created_at))
            .add(row);
    }
    buckets.into_values().rev().map(PeriodAccumulator::into_summary).collect()
}

fn summarize_range<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: &str,
    period: PeriodType,
    range: &TimeRange,
    page: &Pagination,
) -> Result<Vec<PeriodSummary>, SensorDataError> {
    let rows = store
        .readings_in_range(sensor_code, range)
        .map_err(SensorDataError::Store)?;
    let summaries = aggregate(&rows, period);
    debug!(
        "Summary: sensor '{}' {} -> {} row(s) in {} bucket(s), page {}",
        sensor_code,
        period,
        rows.len(),
        summaries.len(),
        page.page
    );
    Ok(page.apply(summaries))
}

/// Calendar summaries (`daily|weekly|monthly`) over readings in `range`.
///
/// The range filter applies to readings before bucketing, so a partially
/// covered period only reflects the readings inside the range.
pub fn summarize<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: Option<&str>,
    period: &str,
    range: &TimeRange,
    page: &Pagination,
) -> Result<Vec<PeriodSummary>, SensorDataError> {
    let sensor_code = require_sensor_code(sensor_code)?;
    let period: PeriodType = period.parse()?;
    summarize_range(store, sensor_code, period, range, page)
}

/// Daily summaries over a trailing window (`day|week|month|year|all`) ending
/// at `now`.
pub fn summarize_trailing_daily<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: Option<&str>,
    window: &str,
    now: DateTime<Utc>,
    page: &Pagination,
) -> Result<Vec<PeriodSummary>, SensorDataError> {
    let sensor_code = require_sensor_code(sensor_code)?;
    let window: TrailingWindow = window.parse()?;
    summarize_range(store, sensor_code, PeriodType::Daily, &TimeRange::trailing(window, now), page)
}
