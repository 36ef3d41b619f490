//! Location model for the tracked places

use serde::{Deserialize, Serialize};

/// A named point the service polls weather for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Unique location name
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new<S: Into<String>>(name: S, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Format coordinates the way the forecast API expects them (2 decimals)
    #[must_use]
    pub fn query_coordinates(&self) -> (String, String) {
        (
            format!("{:.2}", self.latitude),
            format!("{:.2}", self.longitude),
        )
    }

    /// Whether both coordinates lie strictly within `tolerance` degrees
    #[must_use]
    pub fn is_near(&self, latitude: f64, longitude: f64, tolerance: f64) -> bool {
        (self.latitude - latitude).abs() < tolerance
            && (self.longitude - longitude).abs() < tolerance
    }
}
