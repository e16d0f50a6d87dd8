//! System statistics cache

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::{Clock, ExpiringCache, SystemClock};
use crate::data::system::sample_system_stats;
use crate::data::{SystemProbe, SystemStatsSnapshot};

/// Errors surfaced by `SystemStatsCache::get`
///
/// Individual probe failures never appear here; they are logged and zeroed.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The blocking sampling task panicked or was cancelled
    #[error("system sampling task failed: {0}")]
    Sampling(#[from] tokio::task::JoinError),
}

/// Read-through cache in front of local resource sampling
pub struct SystemStatsCache {
    probe: Arc<dyn SystemProbe>,
    root: PathBuf,
    cache: ExpiringCache<SystemStatsSnapshot>,
}

impl SystemStatsCache {
    /// Creates a cache sampling the root filesystem, fresh for `ttl_secs` seconds
    pub fn new(probe: Arc<dyn SystemProbe>, ttl_secs: u64) -> Self {
        Self::with_clock(probe, ttl_secs, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from a custom clock
    pub fn with_clock(probe: Arc<dyn SystemProbe>, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            probe,
            root: PathBuf::from("/"),
            cache: ExpiringCache::with_clock(ttl_secs, clock),
        }
    }

    /// Returns the current stats snapshot, sampling the host on a miss
    ///
    /// Sampling blocks for about a second while CPU usage is measured, so it
    /// runs on tokio's blocking pool.
    pub async fn get(&self) -> Result<SystemStatsSnapshot, StatsError> {
        self.cache
            .get_or_fetch(|now| {
                let probe = Arc::clone(&self.probe);
                let root = self.root.clone();
                async move {
                    let stats = tokio::task::spawn_blocking(move || {
                        sample_system_stats(probe.as_ref(), &root, now)
                    })
                    .await?;
                    Ok::<_, StatsError>(stats)
                }
            })
            .await
    }

    /// Drops the cached snapshot so the next `get` samples again
    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}
