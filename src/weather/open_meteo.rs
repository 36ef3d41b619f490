//! Open-Meteo forecast client
//!
//! Fetches the `current` block of the forecast endpoint for one location and
//! translates it into a [`WeatherReading`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::WeatherConfig;
use crate::error::WeatherSvcError;
use crate::models::{Location, WeatherReading, parse_timestamp};
use crate::registry::LocationRegistry;
use crate::weather::WeatherFetcher;

/// Fields requested in the `current` query parameter
pub const CURRENT_FIELDS: &str =
    "temperature_2m,relativehumidity_2m,precipitation_probability,visibility,windspeed_10m";

/// Forecast API client
pub struct OpenMeteoClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    registry: Arc<LocationRegistry>,
}

impl OpenMeteoClient {
    /// Create a client for `endpoint`, bounding every call by `timeout`
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        registry: Arc<LocationRegistry>,
    ) -> crate::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| WeatherSvcError::config(format!("parse forecast endpoint: {e}")))?;

        let client = Client::builder()
            .user_agent(concat!("weathersvc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherSvcError::config(format!("create http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            registry,
        })
    }

    pub fn from_config(
        config: &WeatherConfig,
        registry: Arc<LocationRegistry>,
    ) -> crate::Result<Self> {
        Self::new(&config.base_url, config.timeout(), registry)
    }

    /// Build the request URL for a location
    #[must_use]
    pub fn request_url(&self, location: &Location) -> Url {
        let (latitude, longitude) = location.query_coordinates();
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("current", CURRENT_FIELDS)
            .append_pair("latitude", &latitude)
            .append_pair("longitude", &longitude)
            .append_pair("timezone", "GMT");
        url
    }

    async fn fetch(&self, location: &Location) -> crate::Result<WeatherReading> {
        let url = self.request_url(location);
        debug!("Open-Meteo request URL: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(WeatherSvcError::protocol(format!(
                "unexpected status code: {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let parsed: CurrentResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherSvcError::protocol(format!("decoding response: {e}")))?;

        parsed.into_reading(&self.registry)
    }
}

#[async_trait]
impl WeatherFetcher for OpenMeteoClient {
    #[instrument(name = "get_current", skip(self, location), fields(location = %location.name))]
    async fn get_current(&self, location: &Location) -> crate::Result<WeatherReading> {
        let started = Instant::now();
        let reading = tokio::time::timeout(self.timeout, self.fetch(location))
            .await
            .map_err(|_| {
                WeatherSvcError::transport(format!(
                    "request timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        let elapsed = started.elapsed();
        if elapsed > self.timeout / 2 {
            warn!("Slow forecast response: {:.3}s", elapsed.as_secs_f64());
        }
        Ok(reading)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    latitude: f64,
    longitude: f64,
    current: CurrentData,
}

#[derive(Debug, Deserialize)]
struct CurrentData {
    time: String,
    temperature_2m: f64,
    relativehumidity_2m: i32,
    precipitation_probability: i32,
    visibility: f64,
    windspeed_10m: f64,
}

impl CurrentResponse {
    fn into_reading(self, registry: &LocationRegistry) -> crate::Result<WeatherReading> {
        let timestamp = parse_timestamp(&self.current.time)?;
        let location = registry.resolve(self.latitude, self.longitude)?.clone();

        Ok(WeatherReading {
            location,
            timestamp,
            temperature: self.current.temperature_2m,
            relative_humidity: self.current.relativehumidity_2m,
            precipitation_probability: self.current.precipitation_probability,
            visibility: self.current.visibility,
            wind_speed: self.current.windspeed_10m,
        })
    }
}
