//! Background weather prefetch
//!
//! Keeps the weather cache warm so dashboard requests rarely wait on the
//! upstream provider. The task ticks immediately on start, then once per
//! interval, until shut down.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::WeatherCache;

/// Handle for controlling the background prefetch task
pub struct Prefetcher {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Prefetcher {
    /// Spawns the prefetch loop
    ///
    /// # Arguments
    /// * `weather` - The cache to keep warm
    /// * `interval` - Time between refreshes
    ///
    /// # Returns
    /// * `Some(Prefetcher)` controlling the spawned task
    /// * `None` if `interval` is zero, which disables prefetching
    pub fn spawn(weather: Arc<WeatherCache>, interval: Duration) -> Option<Self> {
        if interval.is_zero() {
            info!("weather prefetch disabled");
            return None;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match weather.get().await {
                            Ok(snapshot) => {
                                debug!(condition = %snapshot.condition, "weather prefetched")
                            }
                            Err(e) => warn!(error = %e, "weather prefetch failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            debug!("weather prefetch stopped");
        });

        info!(interval_secs = interval.as_secs(), "weather prefetch started");
        Some(Self { shutdown_tx, task })
    }

    /// Stops the prefetch task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "weather prefetch task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Coordinates;
    use crate::data::weather::CurrentConditions;
    use crate::data::{WeatherError, WeatherProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        async fn fetch_current(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<CurrentConditions, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CurrentConditions {
                temperature: 20.0,
                relative_humidity_2m: 50.0,
                weather_code: 0,
                wind_speed_10m: 5.0,
                cloud_cover: 10.0,
                pressure_msl: 1012.0,
                precipitation: 0.0,
                visibility: 10000.0,
            })
        }
    }

    fn create_cache(provider: Arc<CountingProvider>, ttl_secs: u64) -> Arc<WeatherCache> {
        let location = Coordinates {
            latitude: 43.1629,
            longitude: -77.6099,
        };
        Arc::new(WeatherCache::new(provider, location, ttl_secs))
    }

    #[tokio::test]
    async fn test_zero_interval_disables_prefetch() {
        let provider = Arc::new(CountingProvider::default());
        let prefetcher = Prefetcher::spawn(create_cache(provider.clone(), 600), Duration::ZERO);

        assert!(prefetcher.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prefetch_warms_cache_immediately() {
        let provider = Arc::new(CountingProvider::default());
        let cache = create_cache(provider.clone(), 600);

        let prefetcher = Prefetcher::spawn(cache.clone(), Duration::from_secs(3600)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        prefetcher.shutdown().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        cache.get().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "request should hit the warm cache");
    }

    #[tokio::test]
    async fn test_prefetch_repeats_until_shutdown() {
        let provider = Arc::new(CountingProvider::default());
        let cache = create_cache(provider.clone(), 0);

        let prefetcher = Prefetcher::spawn(cache, Duration::from_millis(20)).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        prefetcher.shutdown().await;

        let calls = provider.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected repeated prefetches, got {calls}");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls);
    }
}
