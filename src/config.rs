use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::models::matching::MatchStrategy;
use crate::models::route::ClusterStrategy;

const DEFAULT_GEOCODING_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_MAX_MATCH_ITEMS: usize = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub geocoding_api_url: String,
    pub geocoding_api_key: String,
    pub geocode_rate_limit: usize,
    pub geocode_rate_window: Duration,
    pub geocode_cache_ttl_days: i64,
    pub geocode_cache_path: Option<String>,
    pub cache_sweep_interval: Duration,
    pub provider_timeout: Duration,
    pub average_speed_kmh: f64,
    pub match_strategy: MatchStrategy,
    /// Upper bound on items (and batch requests) accepted by one match call.
    pub max_match_items: usize,
    pub route_strategy: ClusterStrategy,
    pub max_stops_per_route: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lookup = &lookup;

        let config = Self {
            http_port: parse_or_default(lookup, "HTTP_PORT", 3000)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            geocoding_api_url: lookup("GEOCODING_API_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODING_API_URL.to_string()),
            geocoding_api_key: lookup("GOOGLE_MAPS_API_KEY").unwrap_or_default(),
            geocode_rate_limit: parse_or_default(lookup, "GEOCODE_RATE_LIMIT", 25)?,
            geocode_rate_window: Duration::from_millis(parse_or_default(
                lookup,
                "GEOCODE_RATE_WINDOW_MS",
                1000,
            )?),
            geocode_cache_ttl_days: parse_or_default(lookup, "GEOCODE_CACHE_TTL_DAYS", 30)?,
            geocode_cache_path: lookup("GEOCODE_CACHE_PATH"),
            cache_sweep_interval: Duration::from_secs(parse_or_default(
                lookup,
                "CACHE_SWEEP_INTERVAL_SECS",
                3600,
            )?),
            provider_timeout: Duration::from_secs(parse_or_default(
                lookup,
                "PROVIDER_TIMEOUT_SECS",
                5,
            )?),
            average_speed_kmh: parse_or_default(lookup, "AVERAGE_SPEED_KMH", 30.0)?,
            match_strategy: parse_or_default(lookup, "MATCH_STRATEGY", MatchStrategy::Assignment)?,
            max_match_items: parse_or_default(lookup, "MAX_MATCH_ITEMS", DEFAULT_MAX_MATCH_ITEMS)?,
            route_strategy: parse_or_default(
                lookup,
                "ROUTE_STRATEGY",
                ClusterStrategy::PairwiseGreedy,
            )?,
            max_stops_per_route: parse_optional(lookup, "MAX_STOPS_PER_ROUTE")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.geocode_rate_limit == 0 {
            return Err(AppError::Internal(
                "invalid GEOCODE_RATE_LIMIT: must be > 0".to_string(),
            ));
        }
        if self.geocode_cache_ttl_days <= 0 {
            return Err(AppError::Internal(
                "invalid GEOCODE_CACHE_TTL_DAYS: must be > 0".to_string(),
            ));
        }
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(AppError::Internal(
                "invalid AVERAGE_SPEED_KMH: must be > 0".to_string(),
            ));
        }
        if self.cache_sweep_interval.is_zero() {
            return Err(AppError::Internal(
                "invalid CACHE_SWEEP_INTERVAL_SECS: must be > 0".to_string(),
            ));
        }
        if self.max_match_items == 0 {
            return Err(AppError::Internal(
                "invalid MAX_MATCH_ITEMS: must be > 0".to_string(),
            ));
        }
        if self.max_stops_per_route == Some(0) {
            return Err(AppError::Internal(
                "invalid MAX_STOPS_PER_ROUTE: must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            geocoding_api_url: DEFAULT_GEOCODING_API_URL.to_string(),
            geocoding_api_key: String::new(),
            geocode_rate_limit: 25,
            geocode_rate_window: Duration::from_secs(1),
            geocode_cache_ttl_days: 30,
            geocode_cache_path: None,
            cache_sweep_interval: Duration::from_secs(3600),
            provider_timeout: Duration::from_secs(5),
            average_speed_kmh: 30.0,
            match_strategy: MatchStrategy::Assignment,
            max_match_items: DEFAULT_MAX_MATCH_ITEMS,
            route_strategy: ClusterStrategy::PairwiseGreedy,
            max_stops_per_route: None,
        }
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn error_message(result: Result<Config, AppError>) -> String {
        match result {
            Err(AppError::Internal(message)) => message,
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.http_port, 3000);
        assert_eq!(config.geocode_rate_limit, 25);
        assert_eq!(config.geocode_rate_window, Duration::from_secs(1));
        assert_eq!(config.geocode_cache_ttl_days, 30);
        assert!(config.geocode_cache_path.is_none());
        assert_eq!(config.match_strategy, MatchStrategy::Assignment);
        assert_eq!(config.route_strategy, ClusterStrategy::PairwiseGreedy);
        assert_eq!(config.max_match_items, 500);
        assert_eq!(config.max_stops_per_route, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("HTTP_PORT", "8080"),
            ("GEOCODE_RATE_WINDOW_MS", "250"),
            ("ROUTE_STRATEGY", "chained"),
            ("MATCH_STRATEGY", "direct"),
            ("MAX_MATCH_ITEMS", "40"),
            ("MAX_STOPS_PER_ROUTE", "6"),
            ("GEOCODE_CACHE_PATH", "/tmp/geocode.json"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.geocode_rate_window, Duration::from_millis(250));
        assert_eq!(config.route_strategy, ClusterStrategy::ChainedGreedy);
        assert_eq!(config.match_strategy, MatchStrategy::Direct);
        assert_eq!(config.max_match_items, 40);
        assert_eq!(config.max_stops_per_route, Some(6));
        assert_eq!(config.geocode_cache_path.as_deref(), Some("/tmp/geocode.json"));
    }

    #[test]
    fn unknown_route_strategy_is_rejected() {
        let message = error_message(load(&[("ROUTE_STRATEGY", "zigzag")]));
        assert!(message.contains("ROUTE_STRATEGY"));
    }

    #[test]
    fn unparsable_number_names_the_key() {
        let message = error_message(load(&[("HTTP_PORT", "eighty")]));
        assert!(message.contains("HTTP_PORT"));
    }

    #[test]
    fn zero_values_fail_validation() {
        for key in [
            "CACHE_SWEEP_INTERVAL_SECS",
            "GEOCODE_RATE_LIMIT",
            "GEOCODE_CACHE_TTL_DAYS",
            "MAX_MATCH_ITEMS",
            "MAX_STOPS_PER_ROUTE",
            "AVERAGE_SPEED_KMH",
        ] {
            let message = error_message(load(&[(key, "0")]));
            assert!(message.contains(key), "{key}: {message}");
        }
    }
}
