//! In-memory [`SensorStore`] for service tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::db::models::{NewSensor, NewSensorReading, Sensor, SensorReading};
use crate::db::store::SensorStore;
use crate::pagination::Pagination;
use crate::time_range::TimeRange;

pub struct MemoryStore {
    sensors: Vec<Sensor>,
    readings: Vec<SensorReading>,
    /// Timestamp handed to the next inserted row; advances one second per insert.
    pub clock: DateTime<Utc>,
    /// When set, every operation fails with this message.
    pub fail_with: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            sensors: Vec::new(),
            readings: Vec::new(),
            clock: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
            fail_with: None,
        }
    }

    /// Seed a reading with an explicit event time, bypassing provisioning.
    pub fn push_reading(&mut self, sensor_code: &str, value: &str, created_at: DateTime<Utc>) -> i64 {
        let id = self.readings.len() as i64 + 1;
        self.readings.push(SensorReading {
            id,
            sensor_code: sensor_code.to_string(),
            value: value.to_string(),
            created_at,
            updated_at: created_at,
        });
        id
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    fn check(&self) -> Result<(), String> {
        match &self.fail_with {
            Some(msg) => Err(msg.clone()),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        let now = self.clock;
        self.clock += Duration::seconds(1);
        now
    }
}

impl SensorStore for MemoryStore {
    fn find_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, String> {
        self.check()?;
        if let Some(existing) = self.sensors.iter().find(|s| s.code == new.code) {
            return Ok(existing.clone());
        }
        let now = self.tick();
        let sensor = Sensor {
            id: self.sensors.len() as i64 + 1,
            code: new.code.clone(),
            name: new.name.clone(),
            units: new.units.clone(),
            value_type: new.value_type.clone(),
            created_at: now,
            updated_at: now,
        };
        self.sensors.push(sensor.clone());
        Ok(sensor)
    }

    fn insert_reading(&mut self, new: &NewSensorReading) -> Result<SensorReading, String> {
        self.check()?;
        let now = self.tick();
        let id = self.push_reading(&new.sensor_code, &new.value, now);
        Ok(self.readings[id as usize - 1].clone())
    }

    fn readings_in_range(&mut self, sensor_code: &str, range: &TimeRange) -> Result<Vec<SensorReading>, String> {
        self.check()?;
        let mut rows: Vec<SensorReading> = self
            .readings
            .iter()
            .filter(|r| r.sensor_code == sensor_code && range.contains(r.created_at))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        Ok(rows)
    }

    fn recent_readings(
        &mut self,
        sensor_code: &str,
        range: &TimeRange,
        page: &Pagination,
    ) -> Result<Vec<SensorReading>, String> {
        let mut rows = self.readings_in_range(sensor_code, range)?;
        rows.reverse();
        Ok(page.apply(rows))
    }

    fn list_sensors(&mut self) -> Result<Vec<Sensor>, String> {
        self.check()?;
        let mut sensors = self.sensors.clone();
        sensors.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(sensors)
    }
}
