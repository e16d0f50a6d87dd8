//! Open-Meteo weather API client
//!
//! This module provides functionality to fetch current conditions from the
//! Open-Meteo API and normalize them into our `WeatherSnapshot` structure.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{WeatherCondition, WeatherSnapshot};

/// Base URL for the Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current-condition variables requested from Open-Meteo
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m,cloud_cover,pressure_msl,precipitation,visibility";

/// Upper bound on a single forecast request
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with something other than 200 OK
    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Failed to parse JSON response
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Current conditions as reported by Open-Meteo
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentConditions {
    /// Temperature in Celsius
    #[serde(rename = "temperature_2m", alias = "temperature")]
    pub temperature: f64,
    /// Relative humidity percentage
    pub relative_humidity_2m: f64,
    /// WMO weather code
    pub weather_code: i32,
    /// Wind speed in km/h
    pub wind_speed_10m: f64,
    /// Cloud cover percentage
    pub cloud_cover: f64,
    /// Mean sea level pressure in hPa
    pub pressure_msl: f64,
    /// Precipitation in mm
    pub precipitation: f64,
    /// Visibility in meters
    pub visibility: f64,
}

impl CurrentConditions {
    /// Converts provider units into a dashboard snapshot
    ///
    /// `next_update` is stamped as `now + ttl` so the snapshot carries its own
    /// refresh deadline.
    pub fn into_snapshot(self, now: DateTime<Utc>, ttl: Duration) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: self.temperature,
            condition: weather_code_to_condition(self.weather_code),
            humidity: to_percent(self.relative_humidity_2m),
            wind_speed: self.wind_speed_10m,
            precipitation: self.precipitation,
            cloud_cover: to_percent(self.cloud_cover),
            pressure: self.pressure_msl,
            visibility: meters_to_km(self.visibility),
            last_updated: now,
            next_update: now + ttl,
        }
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: CurrentConditions,
}

/// A source of current weather conditions for a coordinate
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, WeatherError>;
}

/// Client for fetching weather data from Open-Meteo API
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Create a new OpenMeteoClient with a 10 second request timeout
    pub fn new() -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client))
    }

    /// Create a new OpenMeteoClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different forecast endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    /// Fetch current conditions for the given coordinates
    ///
    /// # Returns
    /// * `Ok(CurrentConditions)` - Decoded current conditions
    /// * `Err(WeatherError)` - If the request fails, the status is not 200, or
    ///   the body cannot be decoded
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", format!("{:.4}", latitude)),
                ("longitude", format!("{:.4}", longitude)),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(WeatherError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenMeteoResponse = serde_json::from_str(&body)?;
        debug!(
            weather_code = parsed.current.weather_code,
            temperature = parsed.current.temperature,
            "fetched current weather"
        );
        Ok(parsed.current)
    }
}

/// Map WMO weather code to WeatherCondition
///
/// The first matching arm wins. 80-82 appear in both the snow arm and the
/// rain showers arm, so they resolve to `Snow` and `RainShowers` is never
/// produced.
#[allow(unreachable_patterns)]
pub fn weather_code_to_condition(code: i32) -> WeatherCondition {
    match code {
        0 => WeatherCondition::ClearSky,
        1 | 2 => WeatherCondition::MainlyClear,
        3 => WeatherCondition::Overcast,
        45 | 48 => WeatherCondition::Foggy,
        51 | 53 | 55 => WeatherCondition::Drizzle,
        61 | 63 | 65 => WeatherCondition::Rain,
        71 | 73 | 75 | 77 | 80 | 81 | 82 => WeatherCondition::Snow,
        80 | 81 | 82 => WeatherCondition::RainShowers,
        85 | 86 => WeatherCondition::SnowShowers,
        95 | 96 | 99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Unknown,
    }
}

/// Convert a visibility reading from meters to kilometers
pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

fn to_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
