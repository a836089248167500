//! Write path: validate, provision the sensor if needed, then insert.

use log::{debug, info};

use crate::db::models::{NewSensor, NewSensorReading, Sensor, SensorReading, sensor_defaults};
use crate::db::store::SensorStore;
use crate::error::SensorDataError;
use crate::utils::titleize;

pub const MAX_SENSOR_CODE_LEN: usize = 50;

/// Sensor codes are 1..=50 ASCII letters, digits, underscores or hyphens.
pub fn is_valid_sensor_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SENSOR_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Metadata given to a sensor first seen through the write path.
pub fn default_sensor_for(code: &str) -> NewSensor {
    NewSensor {
        code: code.to_string(),
        name: titleize(code),
        units: sensor_defaults::UNITS.to_string(),
        value_type: sensor_defaults::VALUE_TYPE.to_string(),
    }
}

/// Ensure a sensor row exists for `code`, creating it with
/// [`default_sensor_for`] defaults when absent. Registered metadata is left
/// untouched.
pub fn provision_sensor_if_absent<S: SensorStore + ?Sized>(store: &mut S, code: &str) -> Result<Sensor, SensorDataError> {
    let sensor = store
        .find_or_create_sensor(&default_sensor_for(code))
        .map_err(SensorDataError::Store)?;
    debug!("Ingest: sensor '{}' resolved to id {}", code, sensor.id);
    Ok(sensor)
}

/// Record one reading.
///
/// Both fields are required and must be non-blank. The sensor is provisioned
/// before the insert on every call, so an unknown code registers itself with
/// a titleized name, empty units and value type `string`.
pub fn record_reading<S: SensorStore + ?Sized>(
    store: &mut S,
    sensor_code: Option<&str>,
    value: Option<&str>,
) -> Result<SensorReading, SensorDataError> {
    let sensor_code = sensor_code
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SensorDataError::MissingRequiredField("sensor_code"))?;
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(SensorDataError::MissingRequiredField("value"))?;
    if !is_valid_sensor_code(sensor_code) {
        return Err(SensorDataError::InvalidSensorCode(sensor_code.to_string()));
    }

    provision_sensor_if_absent(store, sensor_code)?;

    let reading = store
        .insert_reading(&NewSensorReading {
            sensor_code: sensor_code.to_string(),
            value: value.to_string(),
        })
        .map_err(SensorDataError::Store)?;
    info!(
        "Ingest: stored reading {} for '{}' at {}",
        reading.id, reading.sensor_code, reading.created_at
    );
    Ok(reading)
}
