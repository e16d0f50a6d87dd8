//! Weather snapshot cache
//!
//! Wraps a `WeatherProvider` so that the dashboard makes at most one upstream
//! call per TTL window and keeps serving the last snapshot while the provider
//! is failing.

use std::sync::Arc;

use super::{Clock, ExpiringCache, SystemClock};
use crate::data::{WeatherError, WeatherProvider, WeatherSnapshot};

/// A fixed forecast location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Read-through cache in front of the weather provider
pub struct WeatherCache {
    provider: Arc<dyn WeatherProvider>,
    location: Coordinates,
    cache: ExpiringCache<WeatherSnapshot>,
}

impl WeatherCache {
    /// Creates a cache whose snapshots stay fresh for `ttl_secs` seconds
    pub fn new(provider: Arc<dyn WeatherProvider>, location: Coordinates, ttl_secs: u64) -> Self {
        Self::with_clock(provider, location, ttl_secs, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from a custom clock
    pub fn with_clock(
        provider: Arc<dyn WeatherProvider>,
        location: Coordinates,
        ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            location,
            cache: ExpiringCache::with_clock(ttl_secs, clock),
        }
    }

    /// Returns the current weather snapshot
    ///
    /// # Returns
    /// * `Ok(WeatherSnapshot)` - Fresh, newly fetched, or stale-on-error snapshot
    /// * `Err(WeatherError)` - The provider failed and no snapshot was ever cached
    pub async fn get(&self) -> Result<WeatherSnapshot, WeatherError> {
        let ttl = self.cache.ttl();
        let Coordinates {
            latitude,
            longitude,
        } = self.location;
        self.cache
            .get_or_fetch(|now| async move {
                let current = self.provider.fetch_current(latitude, longitude).await?;
                Ok::<_, WeatherError>(current.into_snapshot(now, ttl))
            })
            .await
    }

    /// Drops the cached snapshot so the next `get` calls the provider
    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}
