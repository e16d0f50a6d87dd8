//! In-memory read-through caches
//!
//! `ExpiringCache` holds a single value with a TTL. A fresh value is served
//! as-is; an expired or missing value is refetched, and when the refetch fails
//! the last good value is served instead. `WeatherCache` and
//! `SystemStatsCache` put that policy in front of the weather provider and the
//! host probes.

mod manager;
mod system;
mod weather;

pub use manager::{Clock, ExpiringCache, SystemClock};
pub use system::{StatsError, SystemStatsCache};
pub use weather::{Coordinates, WeatherCache};

#[cfg(test)]
pub(crate) use manager::test_clock;
