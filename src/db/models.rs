//! Diesel model structs for sensor metadata and the raw reading time series.
//!
//! Both tables get `created_at`/`updated_at` from column defaults, so the
//! `New*` structs never carry timestamps: event time is assigned by the store.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema;
use crate::utils::iso8601;

// Defaults for sensors provisioned implicitly by the write path.
pub mod sensor_defaults {
    pub const UNITS: &str = "";
    pub const VALUE_TYPE: &str = "string";
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = schema::sensors)]
pub struct Sensor {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub units: String,
    pub value_type: String,
    #[serde(serialize_with = "iso8601::serialize_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "iso8601::serialize_millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, Serialize)]
#[diesel(table_name = schema::sensors)]
pub struct NewSensor {
    pub code: String,
    pub name: String,
    pub units: String,
    pub value_type: String,
}

// Time series: sensor_data
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = schema::sensor_data)]
pub struct SensorReading {
    pub id: i64,
    pub sensor_code: String,
    pub value: String,
    #[serde(serialize_with = "iso8601::serialize_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "iso8601::serialize_millis")]
    pub updated_at: DateTime<Utc>,
}

impl SensorReading {
    /// The reading as a finite float, or `None` when the stored text is not numeric.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Insertable, Serialize)]
#[diesel(table_name = schema::sensor_data)]
pub struct NewSensorReading {
    pub sensor_code: String,
    pub value: String,
}
