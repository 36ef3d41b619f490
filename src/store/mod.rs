use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::WeatherReading;

pub mod sqlite;

pub use sqlite::SqliteWeatherStore;

/// Persistence for weather readings, keyed by (location name, timestamp).
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Insert the reading, or overwrite the stored one with the same key.
    async fn save(&self, reading: &WeatherReading) -> crate::Result<()>;

    /// The reading with the greatest timestamp for `location`.
    ///
    /// Fails with [`crate::WeatherSvcError::NotFound`] when nothing is stored.
    async fn get_latest(&self, location: &str) -> crate::Result<WeatherReading>;

    /// Readings for `location` with `from <= timestamp <= to`, newest first.
    async fn get_period(
        &self,
        location: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> crate::Result<Vec<WeatherReading>>;
}
