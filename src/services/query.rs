//! Raw (non-aggregating) read path.

use chrono::{DateTime, Utc};
use log::debug;

use crate::db::models::{Sensor, SensorReading};
use crate::db::store::SensorStore;
use crate::error::SensorDataError;
use crate::pagination::Pagination;
use crate::time_range::{TimeRange, TrailingWindow};

/// Reject an absent or blank sensor code. Anything else is looked up exactly
/// as given; unknown codes just have no readings.
pub fn require_sensor_code(sensor_code: Option<&str>) -> Result<&str, SensorDataError> {
    sensor_code
        .filter(|s| !s.trim().is_empty())
        .ok_or(SensorDataError::MissingRequiredField("sensor_code"))
}

/// One page of readings in `range`, most recent first.
pub fn list_readings<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: Option<&str>,
    range: &TimeRange,
    page: &Pagination,
) -> Result<Vec<SensorReading>, SensorDataError> {
    let sensor_code = require_sensor_code(sensor_code)?;
    let rows = store
        .recent_readings(sensor_code, range, page)
        .map_err(SensorDataError::Store)?;
    debug!(
        "Query: sensor '{}' page {} (per {}) -> {} row(s)",
        sensor_code,
        page.page,
        page.per_page,
        rows.len()
    );
    Ok(rows)
}

/// One page of readings from a trailing window ending at `now`, most recent first.
pub fn last_readings<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: Option<&str>,
    window: &str,
    now: DateTime<Utc>,
    page: &Pagination,
) -> Result<Vec<SensorReading>, SensorDataError> {
    let sensor_code = require_sensor_code(sensor_code)?;
    let window: TrailingWindow = window.parse()?;
    list_readings(store, Some(sensor_code), &TimeRange::trailing(window, now), page)
}

pub fn list_sensors<S: SensorStore + ?Sized>(store: &mut S) -> Result<Vec<Sensor>, SensorDataError> {
    store.list_sensors().map_err(SensorDataError::Store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::ingest::record_reading;
    use chrono::{Duration, TimeZone};

    fn page(page: Option<i64>, per: Option<i64>) -> Pagination {
        Pagination::new(page, per, 50, 1000)
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..3 {
            store.push_reading(
                "test_sensor",
                &format!("{}", 20 + i),
                Utc.with_ymd_and_hms(2025, 8, 1 + i as u32, 0, 0, 0).unwrap(),
            );
        }
        store.push_reading("other", "1", Utc.with_ymd_and_hms(2025, 8, 2, 0, 0, 0).unwrap());
        store
    }

    #[test]
    fn returns_readings_most_recent_first() {
        let mut store = seeded();
        let rows = list_readings(&mut store, Some("test_sensor"), &TimeRange::unbounded(), &page(None, None)).unwrap();
        let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, ["22", "21", "20"]);
    }

    #[test]
    fn applies_inclusive_after_and_before() {
        let mut store = seeded();
        let range = TimeRange::resolve(Some("2025-08-02T00:00:00Z"), Some("2025-08-03T23:59:59Z"));
        let rows = list_readings(&mut store, Some("test_sensor"), &range, &page(None, None)).unwrap();
        assert_eq!(rows.len(), 2);

        let range = TimeRange::resolve(Some("2025-08-02T00:00:00Z"), Some("2025-08-02T00:00:00Z"));
        let rows = list_readings(&mut store, Some("test_sensor"), &range, &page(None, None)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "21");
    }

    #[test]
    fn malformed_filters_are_ignored() {
        let mut store = seeded();
        let range = TimeRange::resolve(Some("garbage"), Some("also garbage"));
        let rows = list_readings(&mut store, Some("test_sensor"), &range, &page(None, None)).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn paginates_raw_readings() {
        let mut store = seeded();
        let first = list_readings(&mut store, Some("test_sensor"), &TimeRange::unbounded(), &page(Some(1), Some(2))).unwrap();
        let second = list_readings(&mut store, Some("test_sensor"), &TimeRange::unbounded(), &page(Some(2), Some(2))).unwrap();
        let third = list_readings(&mut store, Some("test_sensor"), &TimeRange::unbounded(), &page(Some(3), Some(2))).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(third.is_empty());
        assert_eq!(second[0].value, "20");
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let mut store = MemoryStore::new();
        let ts = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
        store.push_reading("s", "first", ts);
        store.push_reading("s", "second", ts);
        let rows = list_readings(&mut store, Some("s"), &TimeRange::unbounded(), &page(None, None)).unwrap();
        assert_eq!(rows[0].value, "second");
        assert_eq!(rows[1].value, "first");
    }

    #[test]
    fn unknown_sensor_yields_empty_list() {
        let mut store = seeded();
        let rows = list_readings(&mut store, Some("nonexistent_sensor"), &TimeRange::unbounded(), &page(None, None)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn requires_sensor_code() {
        let mut store = seeded();
        assert_eq!(
            list_readings(&mut store, None, &TimeRange::unbounded(), &page(None, None)),
            Err(SensorDataError::MissingRequiredField("sensor_code"))
        );
        assert_eq!(
            list_readings(&mut store, Some(""), &TimeRange::unbounded(), &page(None, None)),
            Err(SensorDataError::MissingRequiredField("sensor_code"))
        );
        assert_eq!(
            list_readings(&mut store, Some("  "), &TimeRange::unbounded(), &page(None, None)),
            Err(SensorDataError::MissingRequiredField("sensor_code"))
        );
    }

    #[test]
    fn sensor_code_is_matched_verbatim() {
        let mut store = seeded();
        assert_eq!(require_sensor_code(Some(" test_sensor")), Ok(" test_sensor"));
        let rows = list_readings(&mut store, Some(" test_sensor"), &TimeRange::unbounded(), &page(None, None)).unwrap();
        assert!(rows.is_empty());
        let rows = list_readings(&mut store, Some("test_sensor "), &TimeRange::unbounded(), &page(None, None)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn last_day_excludes_older_readings() {
        let mut store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap();
        for (hours, value) in [(1, "20.0"), (12, "21.0"), (23, "22.0"), (24, "23.0"), (25, "19.0")] {
            store.push_reading("last_day_sensor", value, now - Duration::hours(hours));
        }
        let rows = last_readings(&mut store, Some("last_day_sensor"), "day", now, &page(None, None)).unwrap();
        let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
        // exactly 24h old is on the cutoff and included
        assert_eq!(values, ["20.0", "21.0", "22.0", "23.0"]);
    }

    #[test]
    fn last_week_month_year_and_all() {
        let mut store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap();
        for days in [1, 6, 8, 20, 35, 300, 400] {
            store.push_reading("s", &days.to_string(), now - Duration::days(days));
        }
        let count = |store: &mut MemoryStore, window: &str| {
            last_readings(store, Some("s"), window, now, &page(None, None)).unwrap().len()
        };
        assert_eq!(count(&mut store, "week"), 2);
        assert_eq!(count(&mut store, "month"), 4);
        assert_eq!(count(&mut store, "year"), 6);
        assert_eq!(count(&mut store, "all"), 7);
    }

    #[test]
    fn last_rejects_unknown_window() {
        let mut store = seeded();
        let now = Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap();
        assert_eq!(
            last_readings(&mut store, Some("test_sensor"), "decade", now, &page(None, None)),
            Err(SensorDataError::InvalidPeriod("decade".into()))
        );
    }

    #[test]
    fn lists_sensors_by_code() {
        let mut store = MemoryStore::new();
        record_reading(&mut store, Some("temp_kitchen"), Some("21")).unwrap();
        record_reading(&mut store, Some("humidity_living"), Some("40")).unwrap();
        let sensors = list_sensors(&mut store).unwrap();
        let codes: Vec<&str> = sensors.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, ["humidity_living", "temp_kitchen"]);
    }
}
