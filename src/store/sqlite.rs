//! SQLite-backed weather store.
//!
//! One `weather` table keyed by `(location_name, timestamp)`. Timestamps are
//! stored as `YYYY-MM-DDThh:mm` text, which sorts chronologically.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::task;
use tracing::{debug, info, instrument};

use crate::error::WeatherSvcError;
use crate::models::{Location, WeatherReading, format_timestamp, parse_timestamp};
use crate::store::WeatherStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS weather (
    location_name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    timestamp TEXT NOT NULL,
    temperature_2m REAL NOT NULL,
    relativehumidity_2m INTEGER NOT NULL,
    precipitation_probability INTEGER NOT NULL,
    visibility REAL NOT NULL,
    windspeed_10m REAL NOT NULL,
    PRIMARY KEY (location_name, timestamp)
);
"#;

const QUERY_UPSERT: &str = "INSERT INTO weather (location_name, latitude, longitude, timestamp, temperature_2m, relativehumidity_2m, precipitation_probability, visibility, windspeed_10m)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT (location_name, timestamp) DO UPDATE SET
         latitude = excluded.latitude,
         longitude = excluded.longitude,
         temperature_2m = excluded.temperature_2m,
         relativehumidity_2m = excluded.relativehumidity_2m,
         precipitation_probability = excluded.precipitation_probability,
         visibility = excluded.visibility,
         windspeed_10m = excluded.windspeed_10m";

const QUERY_GET_LATEST: &str = "SELECT location_name, latitude, longitude, timestamp, temperature_2m, relativehumidity_2m, precipitation_probability, visibility, windspeed_10m
     FROM weather
     WHERE location_name = ?1
     ORDER BY timestamp DESC
     LIMIT 1";

const QUERY_GET_PERIOD: &str = "SELECT location_name, latitude, longitude, timestamp, temperature_2m, relativehumidity_2m, precipitation_probability, visibility, windspeed_10m
     FROM weather
     WHERE location_name = ?1
       AND timestamp BETWEEN ?2 AND ?3
     ORDER BY timestamp DESC";

/// Weather store over a single shared SQLite connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteWeatherStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWeatherStore {
    /// Open (or create) the database at `path`, create the schema and verify
    /// the connection answers queries.
    pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let shown = path.display().to_string();
        let conn = task::spawn_blocking(move || Connection::open(path))
            .await
            .map_err(|e| WeatherSvcError::storage(format!("open task failed: {e}")))?
            .map_err(|e| WeatherSvcError::storage(format!("open {shown}: {e}")))?;

        let store = Self::from_connection(conn)?;
        store.ping().await?;
        info!("Opened weather store at {}", shown);
        Ok(store)
    }

    /// In-memory store, mostly useful for tests.
    pub fn open_in_memory() -> crate::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> crate::Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| WeatherSvcError::storage(format!("create schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, context: &'static str, f: F) -> crate::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let result = task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&*guard)
        })
        .await
        .map_err(|e| WeatherSvcError::storage(format!("{context}: task failed: {e}")))?;
        result.map_err(|e| WeatherSvcError::storage(format!("{context}: {e}")))
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> crate::Result<()> {
        self.with_conn("db ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        })
        .await
        .map(|_| ())
    }

    /// Number of stored readings for a location.
    pub async fn count_readings(&self, location: &str) -> crate::Result<usize> {
        let location = location.to_string();
        let count: i64 = self
            .with_conn("count readings", move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM weather WHERE location_name = ?1",
                    params![location],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn row_to_reading(row: &rusqlite::Row) -> rusqlite::Result<WeatherReading> {
        let timestamp_str: String = row.get(3)?;
        let timestamp = parse_timestamp(&timestamp_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(WeatherReading {
            location: Location {
                name: row.get(0)?,
                latitude: row.get(1)?,
                longitude: row.get(2)?,
            },
            timestamp,
            temperature: row.get(4)?,
            relative_humidity: row.get(5)?,
            precipitation_probability: row.get(6)?,
            visibility: row.get(7)?,
            wind_speed: row.get(8)?,
        })
    }
}

#[async_trait]
impl WeatherStore for SqliteWeatherStore {
    #[instrument(name = "save_weather", level = "debug", skip(self, reading), fields(location = %reading.location.name, timestamp = %reading.timestamp))]
    async fn save(&self, reading: &WeatherReading) -> crate::Result<()> {
        let reading = reading.clone();
        self.with_conn("upsert", move |conn| {
            conn.execute(
                QUERY_UPSERT,
                params![
                    reading.location.name,
                    reading.location.latitude,
                    reading.location.longitude,
                    format_timestamp(&reading.timestamp),
                    reading.temperature,
                    reading.relative_humidity,
                    reading.precipitation_probability,
                    reading.visibility,
                    reading.wind_speed,
                ],
            )
        })
        .await?;

        debug!("Reading saved");
        Ok(())
    }

    #[instrument(name = "get_latest_weather", level = "debug", skip(self))]
    async fn get_latest(&self, location: &str) -> crate::Result<WeatherReading> {
        let name = location.to_string();
        let found = self
            .with_conn("get latest", move |conn| {
                conn.query_row(QUERY_GET_LATEST, params![name], Self::row_to_reading)
                    .optional()
            })
            .await?;

        found.ok_or_else(|| WeatherSvcError::not_found(location))
    }

    #[instrument(name = "get_weather_period", level = "debug", skip(self))]
    async fn get_period(
        &self,
        location: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> crate::Result<Vec<WeatherReading>> {
        let name = location.to_string();
        let from = format_timestamp(&from);
        let to = format_timestamp(&to);
        self.with_conn("get period", move |conn| {
            let mut stmt = conn.prepare(QUERY_GET_PERIOD)?;
            let readings = stmt
                .query_map(params![name, from, to], Self::row_to_reading)?
                .collect::<rusqlite::Result<Vec<_>>>();
            readings
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(name: &str, hour: u32, temperature: f64) -> WeatherReading {
        WeatherReading {
            location: Location::new(name, 43.2567, 76.9286),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap(),
            temperature,
            relative_humidity: 70,
            precipitation_probability: 20,
            visibility: 10000.0,
            wind_speed: 5.5,
        }
    }

    #[tokio::test]
    async fn test_save_then_get_latest_round_trip() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        let saved = reading("Almaty", 9, -2.5);

        store.save(&saved).await.unwrap();
        let loaded = store.get_latest("Almaty").await.unwrap();

        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        let saved = reading("Almaty", 9, -2.5);

        store.save(&saved).await.unwrap();
        store.save(&saved).await.unwrap();
        store.save(&saved).await.unwrap();

        assert_eq!(store.count_readings("Almaty").await.unwrap(), 1);
        assert_eq!(store.get_latest("Almaty").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_same_key_updates_fields() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        store.save(&reading("Almaty", 9, -2.5)).await.unwrap();

        let mut updated = reading("Almaty", 9, 1.0);
        updated.location.latitude = 43.25;
        updated.wind_speed = 12.0;
        updated.precipitation_probability = 80;
        store.save(&updated).await.unwrap();

        assert_eq!(store.count_readings("Almaty").await.unwrap(), 1);
        assert_eq!(store.get_latest("Almaty").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_new_timestamp_adds_row_and_wins_latest() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        store.save(&reading("Almaty", 10, 3.0)).await.unwrap();
        store.save(&reading("Almaty", 9, 1.0)).await.unwrap();

        assert_eq!(store.count_readings("Almaty").await.unwrap(), 2);
        let latest = store.get_latest("Almaty").await.unwrap();
        assert_eq!(latest.timestamp.format("%H").to_string(), "10");
        assert_eq!(latest.temperature, 3.0);
    }

    #[tokio::test]
    async fn test_get_latest_missing_location_is_not_found() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        store.save(&reading("Almaty", 9, 1.0)).await.unwrap();

        let err = store.get_latest("Moscow").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_locations_are_isolated() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        store.save(&reading("Almaty", 9, 1.0)).await.unwrap();
        store.save(&reading("Moscow", 9, -8.0)).await.unwrap();

        assert_eq!(store.get_latest("Almaty").await.unwrap().temperature, 1.0);
        assert_eq!(store.get_latest("Moscow").await.unwrap().temperature, -8.0);
    }

    #[tokio::test]
    async fn test_get_period_inclusive_and_descending() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        for hour in 6..12 {
            store
                .save(&reading("Almaty", hour, f64::from(hour)))
                .await
                .unwrap();
        }
        store.save(&reading("Moscow", 8, 0.0)).await.unwrap();

        let from = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let readings = store.get_period("Almaty", from, to).await.unwrap();

        let temps: Vec<f64> = readings.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![10.0, 9.0, 8.0]);
        assert!(readings.iter().all(|r| r.location.name == "Almaty"));
    }

    #[tokio::test]
    async fn test_get_period_inverted_range_is_empty() {
        let store = SqliteWeatherStore::open_in_memory().unwrap();
        store.save(&reading("Almaty", 9, 1.0)).await.unwrap();

        let from = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
        assert!(store.get_period("Almaty", from, to).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_on_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");

        let store = SqliteWeatherStore::open(&path).await.unwrap();
        store.save(&reading("Almaty", 9, 4.0)).await.unwrap();
        drop(store);

        let reopened = SqliteWeatherStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_latest("Almaty").await.unwrap().temperature, 4.0);
    }

    #[tokio::test]
    async fn test_open_unreachable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("weather.db");

        let result = SqliteWeatherStore::open(&path).await;
        assert!(matches!(result, Err(WeatherSvcError::Storage { .. })));
    }
}
