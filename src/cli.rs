//! Command-line and environment configuration
//!
//! Every setting can be given as a flag or through its environment variable;
//! flags win. `Config::from_cli` validates the parsed values and fills in the
//! default database location.

use clap::builder::BoolishValueParser;
use clap::Parser;
use directories::ProjectDirs;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// Error types for configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("latitude must be between -90 and 90, got {0}")]
    InvalidLatitude(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    InvalidLongitude(f64),

    /// No `--database-url` was given and no data directory could be derived
    #[error("DATABASE_URL is required: no data directory is available for the default database")]
    MissingDatabaseUrl,
}

/// Homedash - a self-hosted home dashboard server
#[derive(Parser, Debug, Clone)]
#[command(name = "homedash")]
#[command(about = "Home dashboard server for weather, system stats and widgets")]
#[command(version)]
pub struct Cli {
    /// SQLite database URL, e.g. sqlite:///var/lib/homedash/homedash.db
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "APP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Deployment environment; "production" switches logs to JSON
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub app_env: String,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Password that creates a user on first login
    #[arg(long, env = "LOGIN_PASSWORD", default_value = "checkpoint", hide_env_values = true)]
    pub login_password: String,

    /// Forecast latitude in decimal degrees
    #[arg(long, env = "WEATHER_LATITUDE", default_value_t = 43.1629, allow_hyphen_values = true)]
    pub latitude: f64,

    /// Forecast longitude in decimal degrees
    #[arg(long, env = "WEATHER_LONGITUDE", default_value_t = -77.6099, allow_hyphen_values = true)]
    pub longitude: f64,

    /// Seconds a weather snapshot stays fresh
    #[arg(long, env = "WEATHER_CACHE_TTL", default_value_t = 600)]
    pub weather_cache_ttl: u64,

    /// Seconds a system stats snapshot stays fresh
    #[arg(long, env = "STATS_POLL_INTERVAL", default_value_t = 5)]
    pub stats_cache_ttl: u64,

    /// Seconds between background weather refreshes (0 disables)
    #[arg(long, env = "WEATHER_POLL_INTERVAL", default_value_t = 600)]
    pub weather_poll_interval: u64,

    /// Serve the system stats widget
    #[arg(
        long,
        env = "SYSTEM_STATS_ENABLED",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub system_stats_enabled: bool,

    /// Serve the uptime widget
    #[arg(
        long,
        env = "UPTIME_ENABLED",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub uptime_enabled: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub bind: IpAddr,
    pub port: u16,
    pub app_env: String,
    pub log_level: String,
    pub login_password: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather_cache_ttl: u64,
    pub stats_cache_ttl: u64,
    pub weather_poll_interval: u64,
    pub system_stats_enabled: bool,
    pub uptime_enabled: bool,
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(Config)` with every value resolved
    /// * `Err(ConfigError)` if a coordinate is out of range or no database is available
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if !(-90.0..=90.0).contains(&cli.latitude) {
            return Err(ConfigError::InvalidLatitude(cli.latitude));
        }
        if !(-180.0..=180.0).contains(&cli.longitude) {
            return Err(ConfigError::InvalidLongitude(cli.longitude));
        }

        let database_url = match &cli.database_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => default_database_url().ok_or(ConfigError::MissingDatabaseUrl)?,
        };

        Ok(Config {
            database_url,
            bind: cli.bind,
            port: cli.port,
            app_env: cli.app_env.clone(),
            log_level: cli.log_level.clone(),
            login_password: cli.login_password.clone(),
            latitude: cli.latitude,
            longitude: cli.longitude,
            weather_cache_ttl: cli.weather_cache_ttl,
            stats_cache_ttl: cli.stats_cache_ttl,
            weather_poll_interval: cli.weather_poll_interval,
            system_stats_enabled: cli.system_stats_enabled,
            uptime_enabled: cli.uptime_enabled,
        })
    }

    /// Address the HTTP server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// `sqlite://<data dir>/homedash.db?mode=rwc` under the platform data directory
fn default_database_url() -> Option<String> {
    let dirs = ProjectDirs::from("", "", "homedash")?;
    let path = dirs.data_dir().join("homedash.db");
    Some(format!("sqlite://{}?mode=rwc", path.display()))
}
