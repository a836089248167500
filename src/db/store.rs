//! Storage seam for sensors and readings.
//!
//! Services only talk to [`SensorStore`]; [`PgStore`] is the diesel/Postgres
//! implementation used by the server.

use diesel::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::db::models::{NewSensor, NewSensorReading, Sensor, SensorReading};
use crate::pagination::Pagination;
use crate::schema;
use crate::time_range::TimeRange;

pub trait SensorStore {
    /// Return the sensor with `new.code`, inserting `new` first if no such
    /// sensor exists. Existing metadata is never overwritten.
    fn find_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, String>;

    /// Insert a reading; `created_at`/`updated_at` are assigned by the store.
    fn insert_reading(&mut self, new: &NewSensorReading) -> Result<SensorReading, String>;

    /// Readings for `sensor_code` within `range`, oldest first (ties by id).
    fn readings_in_range(&mut self, sensor_code: &str, range: &TimeRange) -> Result<Vec<SensorReading>, String>;

    /// One page of readings for `sensor_code` within `range`, newest first
    /// (ties by descending id).
    fn recent_readings(
        &mut self,
        sensor_code: &str,
        range: &TimeRange,
        page: &Pagination,
    ) -> Result<Vec<SensorReading>, String>;

    /// All registered sensors ordered by code.
    fn list_sensors(&mut self) -> Result<Vec<Sensor>, String>;
}

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub fn build_pool(database_url: &str, max_size: u32) -> Result<PgPool, String> {
    Pool::builder()
        .max_size(max_size)
        .build(ConnectionManager::<PgConnection>::new(database_url))
        .map_err(|e| format!("DB pool setup failed: {}", e))
}

pub struct PgStore<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> PgStore<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        PgStore { conn }
    }
}

fn filtered_readings<'a>(sensor_code: &'a str, range: &TimeRange) -> schema::sensor_data::BoxedQuery<'a, diesel::pg::Pg> {
    use schema::sensor_data::dsl as D;

    let mut query = D::sensor_data.filter(D::sensor_code.eq(sensor_code)).into_boxed();
    if let Some(after) = range.after {
        query = query.filter(D::created_at.ge(after));
    }
    if let Some(before) = range.before {
        query = query.filter(D::created_at.le(before));
    }
    query
}

impl SensorStore for PgStore<'_> {
    fn find_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, String> {
        use schema::sensors::dsl as S;

        diesel::insert_into(S::sensors)
            .values(new)
            .on_conflict(S::code)
            .do_nothing()
            .execute(self.conn)
            .map_err(|e| format!("provision sensor failed: {}", e))?;

        S::sensors
            .filter(S::code.eq(&new.code))
            .select(Sensor::as_select())
            .first(self.conn)
            .map_err(|e| format!("fetch sensor failed: {}", e))
    }

    fn insert_reading(&mut self, new: &NewSensorReading) -> Result<SensorReading, String> {
        use schema::sensor_data::dsl as D;

        diesel::insert_into(D::sensor_data)
            .values(new)
            .returning(SensorReading::as_returning())
            .get_result(self.conn)
            .map_err(|e| format!("insert reading failed: {}", e))
    }

    fn readings_in_range(&mut self, sensor_code: &str, range: &TimeRange) -> Result<Vec<SensorReading>, String> {
        use schema::sensor_data::dsl as D;

        filtered_readings(sensor_code, range)
            .order((D::created_at.asc(), D::id.asc()))
            .select(SensorReading::as_select())
            .load(self.conn)
            .map_err(|e| format!("query readings failed: {}", e))
    }

    fn recent_readings(
        &mut self,
        sensor_code: &str,
        range: &TimeRange,
        page: &Pagination,
    ) -> Result<Vec<SensorReading>, String> {
        use schema::sensor_data::dsl as D;

        filtered_readings(sensor_code, range)
            .order((D::created_at.desc(), D::id.desc()))
            .offset(page.offset())
            .limit(page.limit())
            .select(SensorReading::as_select())
            .load(self.conn)
            .map_err(|e| format!("query recent readings failed: {}", e))
    }

    fn list_sensors(&mut self) -> Result<Vec<Sensor>, String> {
        use schema::sensors::dsl as S;

        S::sensors
            .order(S::code.asc())
            .select(Sensor::as_select())
            .load(self.conn)
            .map_err(|e| format!("list sensors failed: {}", e))
    }
}
