//! Weather reading model and timestamp helpers

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherSvcError;
use crate::models::Location;

/// Minute-resolution timestamp format shared by the forecast API and the store
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Current weather for one location at one point in time.
///
/// `(location.name, timestamp)` is the natural key: saving a reading with
/// the same pair replaces the stored one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReading {
    pub location: Location,
    /// Observation time, whole minutes, UTC
    pub timestamp: DateTime<Utc>,
    /// Air temperature at 2 m in Celsius
    #[serde(rename = "temperature_2m")]
    pub temperature: f64,
    /// Relative humidity at 2 m in percent
    #[serde(rename = "relativehumidity_2m")]
    pub relative_humidity: i32,
    /// Precipitation probability in percent
    pub precipitation_probability: i32,
    /// Visibility in meters
    pub visibility: f64,
    /// Wind speed at 10 m in km/h
    #[serde(rename = "windspeed_10m")]
    pub wind_speed: f64,
}

/// Parse a `YYYY-MM-DDThh:mm` timestamp as UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WeatherSvcError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|e| WeatherSvcError::protocol(format!("parse timestamp '{value}': {e}")))
}

/// Format a timestamp as `YYYY-MM-DDThh:mm`, dropping seconds
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
