//! Configuration management for weathersvc
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `WEATHERSVC_*` environment variables (`__` separates nested keys,
//! e.g. `WEATHERSVC_WORKER__INTERVAL_SECONDS=60`).

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::WeatherSvcError;
use crate::models::Location;
use crate::registry::{LocationRegistry, default_locations};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "weathersvc.toml";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSvcConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub weather: WeatherConfig,
    pub logging: LoggingConfig,
    /// Tracked locations, in polling order
    pub locations: Vec<Location>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the read API listens on
    pub listen_addr: String,
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file, or `:memory:`
    pub database_path: String,
}

/// Polling worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Fixed-rate interval between cycles, in seconds
    pub interval_seconds: u64,
}

/// Forecast API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Forecast endpoint URL
    pub base_url: String,
    /// Per-call timeout in seconds
    pub timeout_seconds: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database_path() -> String {
    "weathersvc.db".to_string()
}

fn default_interval_seconds() -> u64 {
    15 * 60
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_weather_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WeatherSvcConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            worker: WorkerConfig::default(),
            weather: WeatherConfig::default(),
            logging: LoggingConfig::default(),
            locations: default_locations(),
        }
    }
}

impl WeatherSvcConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> crate::Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from the given file (if any) and environment variables.
    ///
    /// An explicitly given path must exist; the default file is optional.
    pub fn load_from_path(config_path: Option<PathBuf>) -> crate::Result<Self> {
        let mut builder = Config::builder();

        match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(WeatherSvcError::config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                builder = builder.add_source(
                    File::with_name(DEFAULT_CONFIG_FILE)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("WEATHERSVC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| WeatherSvcError::config(format!("failed to build configuration: {e}")))?;

        let config: WeatherSvcConfig = settings.try_deserialize().map_err(|e| {
            WeatherSvcError::config(format!("failed to deserialize configuration: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_locations()?;
        Ok(())
    }

    /// Build the location registry described by this configuration
    pub fn registry(&self) -> crate::Result<LocationRegistry> {
        LocationRegistry::new(self.locations.clone())
    }

    fn validate_numeric_ranges(&self) -> crate::Result<()> {
        if self.worker.interval_seconds == 0 {
            return Err(WeatherSvcError::config(
                "Worker interval must be at least 1 second",
            ));
        }

        if self.weather.timeout_seconds == 0 {
            return Err(WeatherSvcError::config(
                "Weather API timeout must be at least 1 second",
            ));
        }

        if self.weather.timeout_seconds > 300 {
            return Err(WeatherSvcError::config(
                "Weather API timeout cannot exceed 300 seconds",
            ));
        }

        Ok(())
    }

    fn validate_string_values(&self) -> crate::Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherSvcError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherSvcError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        if !self.weather.base_url.starts_with("http://")
            && !self.weather.base_url.starts_with("https://")
        {
            return Err(WeatherSvcError::config(
                "Weather API base URL must be a valid HTTP or HTTPS URL",
            ));
        }

        if self.server.listen_addr.trim().is_empty() {
            return Err(WeatherSvcError::config("Listen address cannot be empty"));
        }

        if self.storage.database_path.trim().is_empty() {
            return Err(WeatherSvcError::config("Database path cannot be empty"));
        }

        Ok(())
    }

    fn validate_locations(&self) -> crate::Result<()> {
        for location in &self.locations {
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(WeatherSvcError::config(format!(
                    "Latitude of '{}' must be within [-90, 90]",
                    location.name
                )));
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(WeatherSvcError::config(format!(
                    "Longitude of '{}' must be within [-180, 180]",
                    location.name
                )));
            }
        }
        self.registry().map(|_| ())
    }
}
