//! Expiring read-through cache
//!
//! Provides an `ExpiringCache` that holds a single value with expiry timestamps,
//! refreshing it through a caller-supplied fetch operation and falling back to
//! the previous value when a refresh fails.

use chrono::{DateTime, Duration, Utc};
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Longest TTL honoured; larger values are clamped to keep expiry arithmetic in range
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Source of the current time for cache expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wrapper struct for the cached value
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was produced
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

/// Snapshot of the cache contents, including metadata about freshness
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// When the data stops being fresh
    pub expires_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}

/// Holds one value for a fixed TTL in front of an expensive fetch
///
/// Fresh hits are answered under a shared lock. A miss releases the lock,
/// runs the fetch with no lock held, then takes the exclusive lock only to
/// swap in the new entry. Concurrent misses each run their own fetch; there
/// is no in-flight deduplication.
///
/// When a fetch fails, the previous entry is returned even if expired, and the
/// error only reaches the caller when nothing has ever been cached.
pub struct ExpiringCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T> fmt::Debug for ExpiringCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> ExpiringCache<T> {
    /// Creates an empty cache whose entries stay fresh for `ttl_secs` seconds
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    /// Creates an empty cache that reads time from a custom clock
    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            clock,
            entry: RwLock::new(None),
        }
    }

    /// How long a stored value stays fresh
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value, refreshing it through `fetch` when missing or expired
    ///
    /// `fetch` receives the time at which the miss was observed, which also
    /// becomes the new entry's `cached_at`.
    ///
    /// # Returns
    /// * `Ok(T)` with the fresh value, a newly fetched value, or the stale value
    ///   if the fetch failed
    /// * `Err(E)` only if the fetch failed and nothing has ever been cached
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce(DateTime<Utc>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let now = self.clock.now();
        {
            let guard = self.entry.read().await;
            if let Some(entry) = guard.as_ref() {
                if now < entry.expires_at {
                    return Ok(entry.data.clone());
                }
            }
        }

        match fetch(now).await {
            Ok(data) => {
                let cached_at = now;
                let entry = CacheEntry {
                    data: data.clone(),
                    cached_at,
                    expires_at: cached_at + self.ttl,
                };
                *self.entry.write().await = Some(entry);
                debug!(%cached_at, "cache refreshed");
                Ok(data)
            }
            Err(err) => {
                let guard = self.entry.read().await;
                match guard.as_ref() {
                    Some(entry) => {
                        warn!(
                            error = %err,
                            cached_at = %entry.cached_at,
                            "refresh failed, serving stale entry"
                        );
                        Ok(entry.data.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Reads the current entry without fetching
    ///
    /// Returns `None` if nothing is cached. Expired entries are still returned
    /// with `is_expired = true`.
    #[cfg(test)]
    pub(crate) async fn peek(&self) -> Option<CachedData<T>> {
        let now = self.clock.now();
        let guard = self.entry.read().await;
        guard.as_ref().map(|entry| CachedData {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
            is_expired: now >= entry.expires_at,
        })
    }

    /// Drops the cached entry so the next `get_or_fetch` always fetches
    pub async fn clear(&self) {
        self.entry.write().await.take();
    }
}


#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn test_data(name: &str, value: i32) -> TestData {
        TestData {
            name: name.to_string(),
            value,
        }
    }

    fn create_test_cache(ttl_secs: u64) -> (ExpiringCache<TestData>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::with_clock(ttl_secs, clock.clone());
        (cache, clock)
    }

    async fn fetch_counted(
        cache: &ExpiringCache<TestData>,
        calls: &AtomicUsize,
        data: TestData,
    ) -> Result<TestData, String> {
        cache
            .get_or_fetch(|_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(data)
            })
            .await
    }

    #[tokio::test]
    async fn test_hit_within_ttl_does_not_fetch_again() {
        let (cache, clock) = create_test_cache(600);
        let calls = AtomicUsize::new(0);

        let first = fetch_counted(&cache, &calls, test_data("first", 1)).await.unwrap();
        clock.advance(Duration::seconds(599));
        let second = fetch_counted(&cache, &calls, test_data("second", 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "Second call should be a cache hit");
        assert_eq!(first, second);
        assert_eq!(second, test_data("first", 1));
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fetch() {
        let (cache, clock) = create_test_cache(600);
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, test_data("first", 1)).await.unwrap();
        clock.advance(Duration::seconds(600));
        let refreshed = fetch_counted(&cache, &calls, test_data("second", 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed, test_data("second", 2));
    }

    #[tokio::test]
    async fn test_cold_failure_propagates_and_stores_nothing() {
        let (cache, _clock) = create_test_cache(600);

        let result = cache
            .get_or_fetch(|_| async { Err::<TestData, _>("upstream down".to_string()) })
            .await;

        assert_eq!(result.unwrap_err(), "upstream down");
        assert!(cache.peek().await.is_none(), "Nothing should be cached after a cold failure");
    }

    #[tokio::test]
    async fn test_failure_serves_stale_entry_unchanged() {
        let (cache, clock) = create_test_cache(600);
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, test_data("original", 7)).await.unwrap();
        let before = cache.peek().await.expect("Entry should be cached");

        clock.advance(Duration::seconds(700));
        let result = cache
            .get_or_fetch(|_| async { Err::<TestData, _>("timeout".to_string()) })
            .await;

        assert_eq!(result.unwrap(), test_data("original", 7));

        let after = cache.peek().await.expect("Entry should still be cached");
        assert_eq!(after.cached_at, before.cached_at, "cached_at must not move on failure");
        assert_eq!(after.expires_at, before.expires_at, "expires_at must not move on failure");
        assert!(after.is_expired);
    }

    #[tokio::test]
    async fn test_clear_forces_fetch() {
        let (cache, _clock) = create_test_cache(600);
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, test_data("first", 1)).await.unwrap();
        cache.clear().await;
        assert!(cache.peek().await.is_none());

        let value = fetch_counted(&cache, &calls, test_data("second", 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(value, test_data("second", 2));
    }

    #[tokio::test]
    async fn test_fetch_receives_miss_time_and_sets_expiry() {
        let (cache, clock) = create_test_cache(60);
        let expected_now = clock.now();

        cache
            .get_or_fetch(|now| async move {
                assert_eq!(now, expected_now);
                Ok::<_, String>(test_data("timed", 3))
            })
            .await
            .unwrap();

        let entry = cache.peek().await.unwrap();
        assert_eq!(entry.cached_at, expected_now);
        assert_eq!(entry.expires_at, expected_now + Duration::seconds(60));
        assert!(!entry.is_expired);
    }

    #[tokio::test]
    async fn test_slow_fetch_is_stamped_with_miss_time() {
        let (cache, clock) = create_test_cache(60);
        let miss_time = clock.now();

        let fetch_clock = clock.clone();
        cache
            .get_or_fetch(|_| async move {
                fetch_clock.advance(Duration::seconds(5));
                Ok::<_, String>(test_data("slow", 4))
            })
            .await
            .unwrap();

        let entry = cache.peek().await.unwrap();
        assert_eq!(entry.cached_at, miss_time);
        assert_eq!(entry.expires_at, miss_time + Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let (cache, _clock) = create_test_cache(0);
        let calls = AtomicUsize::new(0);

        fetch_counted(&cache, &calls, test_data("a", 1)).await.unwrap();
        fetch_counted(&cache, &calls, test_data("b", 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_hits_share_the_entry() {
        let (cache, _clock) = create_test_cache(600);
        let calls = AtomicUsize::new(0);
        fetch_counted(&cache, &calls, test_data("shared", 9)).await.unwrap();

        let reads = futures::future::join_all(
            (0..8).map(|i| fetch_counted(&cache, &calls, test_data("other", i))),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for read in reads {
            assert_eq!(read.unwrap(), test_data("shared", 9));
        }
    }

    #[test]
    fn test_ttl_is_reported_in_seconds() {
        let cache: ExpiringCache<TestData> = ExpiringCache::new(600);
        assert_eq!(cache.ttl(), Duration::seconds(600));
    }
}
