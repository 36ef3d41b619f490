//! `weathersvc` - current weather poller and read API
//!
//! A polling worker fetches the current weather for a fixed set of locations
//! on a fixed-rate schedule and upserts each reading into SQLite; an HTTP
//! endpoint serves the latest stored reading per location.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod store;
pub mod weather;
pub mod web;
pub mod worker;

// Re-export core types for public API
pub use config::WeatherSvcConfig;
pub use error::WeatherSvcError;
pub use models::{Location, WeatherReading};
pub use registry::LocationRegistry;
pub use store::{SqliteWeatherStore, WeatherStore};
pub use weather::{OpenMeteoClient, WeatherFetcher};
pub use worker::{CycleSummary, PollingWorker, WorkerState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherSvcError>;
