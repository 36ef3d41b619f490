use async_trait::async_trait;

use crate::models::{Location, WeatherReading};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Source of current weather readings.
///
/// Implementations bound each call with their own timeout; any failure
/// means "no reading for this location this cycle".
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    async fn get_current(&self, location: &Location) -> crate::Result<WeatherReading>;
}
