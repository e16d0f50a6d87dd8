//! Core data models for the dashboard
//!
//! This module contains the snapshot types served by the widget endpoints and
//! the records read from the backing store, plus the upstream sources that
//! produce snapshots.

pub mod system;
pub mod weather;

pub use system::{ProbeError, SysinfoProbe, SystemProbe};
pub use weather::{OpenMeteoClient, WeatherError, WeatherProvider};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current weather conditions at the configured location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Human-readable condition derived from the WMO weather code
    pub condition: WeatherCondition,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Precipitation in mm
    pub precipitation: f64,
    /// Cloud cover percentage (0-100)
    pub cloud_cover: u8,
    /// Mean sea level pressure in hPa
    pub pressure: f64,
    /// Visibility in kilometers
    pub visibility: f64,
    /// When this snapshot was produced
    pub last_updated: DateTime<Utc>,
    /// When this snapshot is due to be replaced
    pub next_update: DateTime<Utc>,
}

/// Weather conditions as shown on the dashboard
///
/// Serialized as the display text, e.g. `"Clear sky"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    #[serde(rename = "Clear sky")]
    ClearSky,
    #[serde(rename = "Mainly clear")]
    MainlyClear,
    Overcast,
    Foggy,
    Drizzle,
    Rain,
    Snow,
    #[serde(rename = "Rain showers")]
    RainShowers,
    #[serde(rename = "Snow showers")]
    SnowShowers,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Display text for the condition
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::ClearSky => "Clear sky",
            WeatherCondition::MainlyClear => "Mainly clear",
            WeatherCondition::Overcast => "Overcast",
            WeatherCondition::Foggy => "Foggy",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::RainShowers => "Rain showers",
            WeatherCondition::SnowShowers => "Snow showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host resource usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatsSnapshot {
    /// Aggregate CPU utilization across all cores (0-100)
    pub cpu_percent: f64,
    /// Used memory percentage (0-100)
    pub memory_percent: f64,
    /// Used memory in GB
    pub memory_used_gb: f64,
    /// Total memory in GB
    pub memory_total_gb: f64,
    /// Used space on the root filesystem (0-100)
    pub disk_percent: f64,
    /// Used space on the root filesystem in GB
    pub disk_used_gb: f64,
    /// Size of the root filesystem in GB
    pub disk_total_gb: f64,
    /// Host uptime in seconds
    pub uptime_seconds: u64,
    /// Number of live processes
    pub process_count: usize,
    /// 1, 5 and 15 minute load averages. Not sampled; always zero.
    pub load_average: [f64; 3],
    /// When this snapshot was produced
    pub last_updated: DateTime<Utc>,
}

/// A dashboard user as stored in the `users` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub tailscale_ip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_weather_condition_serializes_as_display_text() {
        let json = serde_json::to_string(&WeatherCondition::ClearSky).unwrap();
        assert_eq!(json, "\"Clear sky\"");

        let json = serde_json::to_string(&WeatherCondition::Thunderstorm).unwrap();
        assert_eq!(json, "\"Thunderstorm\"");
    }

    #[test]
    fn test_weather_condition_display_matches_serialization() {
        for condition in [
            WeatherCondition::ClearSky,
            WeatherCondition::MainlyClear,
            WeatherCondition::RainShowers,
            WeatherCondition::SnowShowers,
            WeatherCondition::Unknown,
        ] {
            let json = serde_json::to_string(&condition).unwrap();
            assert_eq!(json, format!("\"{}\"", condition));
        }
    }

    #[test]
    fn test_weather_snapshot_uses_snake_case_fields() {
        let at = Utc.with_ymd_and_hms(2024, 7, 15, 14, 0, 0).unwrap();
        let snapshot = WeatherSnapshot {
            temperature: 22.5,
            condition: WeatherCondition::MainlyClear,
            humidity: 65,
            wind_speed: 12.5,
            precipitation: 0.0,
            cloud_cover: 20,
            pressure: 1013.2,
            visibility: 24.1,
            last_updated: at,
            next_update: at + chrono::Duration::seconds(600),
        };

        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["condition"], "Mainly clear");
        assert_eq!(value["wind_speed"], 12.5);
        assert_eq!(value["cloud_cover"], 20);
        assert_eq!(value["last_updated"], "2024-07-15T14:00:00Z");
        assert_eq!(value["next_update"], "2024-07-15T14:10:00Z");
    }

    #[test]
    fn test_system_stats_default_is_zeroed() {
        let stats = SystemStatsSnapshot::default();
        assert_eq!(stats.cpu_percent, 0.0);
        assert_eq!(stats.process_count, 0);
        assert_eq!(stats.load_average, [0.0, 0.0, 0.0]);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["load_average"], serde_json::json!([0.0, 0.0, 0.0]));
    }
}
