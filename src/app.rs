//! Application wiring
//!
//! Builds the store, caches and background tasks from a `Config` and hands
//! out the HTTP router.

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::cache::{Coordinates, SystemStatsCache, WeatherCache};
use crate::cli::Config;
use crate::data::{OpenMeteoClient, SysinfoProbe, SystemProbe, WeatherError, WeatherProvider};
use crate::refresh::Prefetcher;
use crate::server::{create_router, AppState};
use crate::store::{Store, StoreError};

/// Errors raised while starting the application
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build weather client: {0}")]
    WeatherClient(#[from] WeatherError),
}

/// A running dashboard: shared state plus background tasks
pub struct App {
    state: AppState,
    prefetcher: Option<Prefetcher>,
}

impl App {
    /// Connects to the database, applies migrations and wires up live sources
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = Store::connect(&config.database_url).await?;
        store.migrate().await?;
        info!("database ready");

        let provider = Arc::new(OpenMeteoClient::new()?);
        Ok(Self::with_components(config, store, provider, Arc::new(SysinfoProbe)))
    }

    /// Wires the application from already constructed parts
    pub fn with_components(
        config: Config,
        store: Store,
        provider: Arc<dyn WeatherProvider>,
        probe: Arc<dyn SystemProbe>,
    ) -> Self {
        let location = Coordinates {
            latitude: config.latitude,
            longitude: config.longitude,
        };
        let weather = Arc::new(WeatherCache::new(provider, location, config.weather_cache_ttl));
        let stats = Arc::new(SystemStatsCache::new(probe, config.stats_cache_ttl));

        let prefetcher = Prefetcher::spawn(
            Arc::clone(&weather),
            Duration::from_secs(config.weather_poll_interval),
        );

        Self {
            state: AppState {
                weather,
                stats,
                store,
                config: Arc::new(config),
            },
            prefetcher,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Stops background tasks
    pub async fn shutdown(self) {
        if let Some(prefetcher) = self.prefetcher {
            prefetcher.shutdown().await;
        }
        info!("application stopped");
    }
}
