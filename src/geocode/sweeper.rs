use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::geocode::Geocoder;

/// Periodically purges stale geocode cache entries. Runs until the runtime shuts down.
pub async fn run_cache_sweeper(geocoder: Arc<Geocoder>, every: Duration) {
    info!(interval_secs = every.as_secs(), "geocode cache sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let purged = geocoder.sweep_expired();
        info!(
            purged,
            remaining = geocoder.cache_len(),
            "geocode cache sweep finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use tokio::time::Duration;

    use super::run_cache_sweeper;
    use crate::geo::GeoPoint;
    use crate::geocode::cache::{CacheEntry, CacheStore, MemoryCacheStore};
    use crate::geocode::testing::StubProvider;
    use crate::geocode::Geocoder;
    use crate::observability::metrics::Metrics;

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_on_first_tick() {
        let cache = Arc::new(MemoryCacheStore::new());
        cache
            .upsert(CacheEntry {
                address: "stale".to_string(),
                point: GeoPoint { lat: 0.0, lng: 0.0 },
                cached_at: Utc::now() - ChronoDuration::days(60),
            })
            .unwrap();
        let geocoder = Arc::new(Geocoder::new(
            Arc::new(StubProvider::default()),
            cache.clone(),
            25,
            Duration::from_secs(1),
            30,
            Metrics::new(),
        ));

        let task = tokio::spawn(run_cache_sweeper(geocoder, Duration::from_secs(3600)));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.is_empty());
        task.abort();
    }
}
