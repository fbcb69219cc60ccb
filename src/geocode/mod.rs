//! Address resolution backed by a TTL cache, a rate-limited provider and
//! per-address single-flight.
//!
//! A lookup goes cache → in-flight gate → cache again → rate limiter → provider.
//! Only successful provider answers are written back; failures and empty
//! answers resolve to `None` and are retried on the next lookup.

pub mod cache;
pub mod provider;
pub mod rate_limit;
pub mod sweeper;

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::geo::GeoPoint;
use crate::observability::metrics::Metrics;

use self::cache::{CacheEntry, CacheStore};
use self::provider::GeocodingProvider;
use self::rate_limit::SlidingWindowLimiter;

pub struct Geocoder {
    provider: Arc<dyn GeocodingProvider>,
    cache: Arc<dyn CacheStore>,
    limiter: SlidingWindowLimiter,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    ttl: ChronoDuration,
    metrics: Metrics,
}

impl Geocoder {
    pub fn new(
        provider: Arc<dyn GeocodingProvider>,
        cache: Arc<dyn CacheStore>,
        max_calls: usize,
        window: Duration,
        ttl_days: i64,
        metrics: Metrics,
    ) -> Self {
        metrics.geocode_cache_entries.set(cache.len() as i64);

        Self {
            provider,
            cache,
            limiter: SlidingWindowLimiter::new(max_calls, window),
            in_flight: DashMap::new(),
            ttl: ChronoDuration::days(ttl_days.max(1)),
            metrics,
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolves an address to coordinates, or `None` when it cannot be resolved.
    pub async fn resolve(&self, address: &str) -> Option<GeoPoint> {
        let key = normalize(address)?;

        if let Some(point) = self.cached(&key, Utc::now()) {
            self.record_lookup("cache_hit");
            return Some(point);
        }

        let gate = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = gate.lock().await;

        // A concurrent lookup of the same address may have filled the cache while we waited.
        let resolved = match self.cached(&key, Utc::now()) {
            Some(point) => {
                self.record_lookup("cache_hit");
                Some(point)
            }
            None => self.fetch_and_store(&key).await,
        };

        drop(guard);
        self.in_flight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) <= 2);

        resolved
    }

    /// Deletes every cache entry older than the TTL.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let purged = match self.cache.delete_older_than(cutoff) {
            Ok(purged) => purged,
            Err(err) => {
                warn!(error = %err, "geocode cache sweep failed");
                0
            }
        };

        self.metrics
            .geocode_cache_entries
            .set(self.cache.len() as i64);
        purged
    }

    /// Writes pending cache mutations to backing storage.
    pub fn flush_cache(&self) {
        match self.cache.flush() {
            Ok(()) => info!(entries = self.cache.len(), "geocode cache flushed"),
            Err(err) => warn!(error = %err, "geocode cache flush failed"),
        }
    }

    fn cached(&self, key: &str, now: DateTime<Utc>) -> Option<GeoPoint> {
        let entry = match self.cache.get(key) {
            Ok(entry) => entry?,
            Err(err) => {
                warn!(address = %key, error = %err, "geocode cache read failed");
                return None;
            }
        };

        let cutoff = now - self.ttl;
        if entry.cached_at < cutoff {
            debug!(address = %key, cached_at = %entry.cached_at, "evicting stale geocode entry");
            if let Err(err) = self.cache.delete_if_older_than(key, cutoff) {
                warn!(address = %key, error = %err, "failed to evict stale geocode entry");
            }
            self.metrics
                .geocode_cache_entries
                .set(self.cache.len() as i64);
            return None;
        }

        Some(entry.point)
    }

    async fn fetch_and_store(&self, key: &str) -> Option<GeoPoint> {
        let waited = self.limiter.acquire().await;
        self.metrics
            .rate_limit_wait_seconds
            .observe(waited.as_secs_f64());

        match self.provider.geocode(key).await {
            Ok(Some(point)) => {
                self.record_provider_call("ok");
                if let Err(err) = self.cache.upsert(CacheEntry::new(key, point)) {
                    warn!(address = %key, error = %err, "failed to store geocode result");
                }
                self.metrics
                    .geocode_cache_entries
                    .set(self.cache.len() as i64);
                self.record_lookup("provider_hit");
                info!(address = %key, lat = point.lat, lng = point.lng, "address geocoded");
                Some(point)
            }
            Ok(None) => {
                self.record_provider_call("zero_results");
                self.record_lookup("not_found");
                info!(address = %key, "address not found by provider");
                None
            }
            Err(err) => {
                self.record_provider_call("error");
                self.record_lookup("not_found");
                warn!(address = %key, error = %err, "geocoding provider call failed");
                None
            }
        }
    }

    fn record_lookup(&self, outcome: &str) {
        self.metrics
            .geocode_lookups_total
            .with_label_values(&[outcome])
            .inc();
    }

    fn record_provider_call(&self, outcome: &str) {
        self.metrics
            .geocode_provider_calls_total
            .with_label_values(&[outcome])
            .inc();
    }
}

fn normalize(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::provider::GeocodingProvider;
    use crate::error::AppError;
    use crate::geo::GeoPoint;

    /// Provider answering from a fixed table and counting calls.
    #[derive(Default)]
    pub struct StubProvider {
        pub known: HashMap<String, GeoPoint>,
        pub failing: Vec<String>,
        pub delay: Option<tokio::time::Duration>,
        pub calls: AtomicUsize,
    }

    impl StubProvider {
        pub fn with(entries: &[(&str, f64, f64)]) -> Self {
            Self {
                known: entries
                    .iter()
                    .map(|(address, lat, lng)| {
                        (
                            address.to_string(),
                            GeoPoint {
                                lat: *lat,
                                lng: *lng,
                            },
                        )
                    })
                    .collect(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GeocodingProvider for StubProvider {
        fn geocode<'a>(
            &'a self,
            address: &'a str,
        ) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.failing.iter().any(|failing| failing == address) {
                    return Err(AppError::GeocodeUnavailable("stub failure".to_string()));
                }
                Ok(self.known.get(address).copied())
            })
        }
    }
}
