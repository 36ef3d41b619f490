//! Error types and handling for weathersvc

use thiserror::Error;

/// Main error type for weathersvc
#[derive(Error, Debug)]
pub enum WeatherSvcError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network failures and timeouts while talking to the forecast API
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The forecast API answered, but not with something we can use
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Coordinates that do not belong to any registered location
    #[error("unknown coordinates: {latitude}, {longitude}")]
    UnknownLocation { latitude: f64, longitude: f64 },

    /// Persistence failures
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// No stored reading for a location
    #[error("no weather stored for location '{location}'")]
    NotFound { location: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherSvcError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(location: S) -> Self {
        Self::NotFound {
            location: location.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for WeatherSvcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::protocol(format!("decoding response: {err}"))
        } else {
            Self::transport(format!("sending http request: {err}"))
        }
    }
}

impl From<rusqlite::Error> for WeatherSvcError {
    fn from(err: rusqlite::Error) -> Self {
        Self::storage(err.to_string())
    }
}
