//! Data models for weathersvc
//!
//! - Location: a named coordinate pair the service tracks
//! - Weather: a single current-weather reading and its timestamp format

pub mod location;
pub mod weather;

pub use location::Location;
pub use weather::{TIMESTAMP_FORMAT, WeatherReading, format_timestamp, parse_timestamp};
