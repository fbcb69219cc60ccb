use std::sync::Arc;

use crate::config::Config;
use crate::engine::routing::RouteClusterer;
use crate::error::AppError;
use crate::geocode::cache::{CacheStore, FileCacheStore, MemoryCacheStore};
use crate::geocode::provider::{GeocodingProvider, GoogleGeocodingClient};
use crate::geocode::Geocoder;
use crate::models::matching::MatchStrategy;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub geocoder: Arc<Geocoder>,
    pub clusterer: RouteClusterer,
    pub match_strategy: MatchStrategy,
    pub max_match_items: usize,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &Config,
        provider: Arc<dyn GeocodingProvider>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let metrics = Metrics::new();
        let geocoder = Geocoder::new(
            provider,
            cache,
            config.geocode_rate_limit,
            config.geocode_rate_window,
            config.geocode_cache_ttl_days,
            metrics.clone(),
        );

        Self {
            geocoder: Arc::new(geocoder),
            clusterer: RouteClusterer {
                strategy: config.route_strategy,
                average_speed_kmh: config.average_speed_kmh,
                max_stops_per_route: config.max_stops_per_route,
            },
            match_strategy: config.match_strategy,
            max_match_items: config.max_match_items,
            metrics,
        }
    }

    /// Wires the Google client and the cache store selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let provider = GoogleGeocodingClient::new(
            &config.geocoding_api_url,
            &config.geocoding_api_key,
            config.provider_timeout,
        )?;

        let cache: Arc<dyn CacheStore> = match &config.geocode_cache_path {
            Some(path) => Arc::new(FileCacheStore::open(path)?),
            None => Arc::new(MemoryCacheStore::new()),
        };

        Ok(Self::new(config, Arc::new(provider), cache))
    }
}
