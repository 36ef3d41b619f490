//! Location Registry
//!
//! The fixed, ordered set of locations the worker polls. Built once at
//! startup from configuration and shared read-only afterwards.

use std::collections::HashSet;

use tracing::debug;

use crate::error::WeatherSvcError;
use crate::models::Location;

/// Maximum per-axis distance in degrees for coordinates to match a location
pub const COORDINATE_TOLERANCE: f64 = 0.1;

/// Ordered, immutable collection of tracked locations
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    /// Build a registry, rejecting blank or duplicate names
    pub fn new(locations: Vec<Location>) -> crate::Result<Self> {
        let mut seen = HashSet::new();
        for location in &locations {
            if location.name.trim().is_empty() {
                return Err(WeatherSvcError::config("location name cannot be empty"));
            }
            if !seen.insert(location.name.as_str()) {
                return Err(WeatherSvcError::config(format!(
                    "duplicate location name '{}'",
                    location.name
                )));
            }
        }
        Ok(Self { locations })
    }

    /// The locations in polling order
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.locations.iter()
    }

    /// Map coordinates reported by the forecast API back to a registered
    /// location. The first location within [`COORDINATE_TOLERANCE`] on both
    /// axes wins.
    pub fn resolve(&self, latitude: f64, longitude: f64) -> crate::Result<&Location> {
        let found = self
            .locations
            .iter()
            .find(|loc| loc.is_near(latitude, longitude, COORDINATE_TOLERANCE));

        match found {
            Some(location) => {
                debug!(
                    "Resolved ({}, {}) to {}",
                    latitude, longitude, location.name
                );
                Ok(location)
            }
            None => Err(WeatherSvcError::UnknownLocation {
                latitude,
                longitude,
            }),
        }
    }
}

/// The locations tracked when configuration does not list any
#[must_use]
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Almaty", 43.2567, 76.9286),
        Location::new("Moscow", 55.7522, 37.6156),
        Location::new("SaintP", 59.9386, 30.3141),
    ]
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self {
            locations: default_locations(),
        }
    }
}

impl<'a> IntoIterator for &'a LocationRegistry {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.iter()
    }
}
