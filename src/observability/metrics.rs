use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub geocode_lookups_total: IntCounterVec,
    pub geocode_provider_calls_total: IntCounterVec,
    pub geocode_cache_entries: IntGauge,
    pub rate_limit_wait_seconds: Histogram,
    pub match_requests_total: IntCounterVec,
    pub match_latency_seconds: HistogramVec,
    pub route_plans_total: IntCounterVec,
    pub route_plan_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let geocode_lookups_total = IntCounterVec::new(
            Opts::new("geocode_lookups_total", "Geocode lookups by outcome"),
            &["outcome"],
        )
        .expect("valid geocode_lookups_total metric");

        let geocode_provider_calls_total = IntCounterVec::new(
            Opts::new(
                "geocode_provider_calls_total",
                "Calls made to the external geocoding provider by outcome",
            ),
            &["outcome"],
        )
        .expect("valid geocode_provider_calls_total metric");

        let geocode_cache_entries =
            IntGauge::new("geocode_cache_entries", "Entries currently in the geocode cache")
                .expect("valid geocode_cache_entries metric");

        let rate_limit_wait_seconds = Histogram::with_opts(HistogramOpts::new(
            "geocode_rate_limit_wait_seconds",
            "Time spent waiting for geocoding rate limit capacity",
        ))
        .expect("valid geocode_rate_limit_wait_seconds metric");

        let match_requests_total = IntCounterVec::new(
            Opts::new("match_requests_total", "Match requests by outcome"),
            &["outcome"],
        )
        .expect("valid match_requests_total metric");

        let match_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "match_latency_seconds",
                "Latency of match ranking in seconds",
            ),
            &["strategy"],
        )
        .expect("valid match_latency_seconds metric");

        let route_plans_total = IntCounterVec::new(
            Opts::new("route_plans_total", "Route plans by outcome"),
            &["outcome"],
        )
        .expect("valid route_plans_total metric");

        let route_plan_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "route_plan_latency_seconds",
                "Latency of route planning in seconds, geocoding included",
            ),
            &["strategy"],
        )
        .expect("valid route_plan_latency_seconds metric");

        registry
            .register(Box::new(geocode_lookups_total.clone()))
            .expect("register geocode_lookups_total");
        registry
            .register(Box::new(geocode_provider_calls_total.clone()))
            .expect("register geocode_provider_calls_total");
        registry
            .register(Box::new(geocode_cache_entries.clone()))
            .expect("register geocode_cache_entries");
        registry
            .register(Box::new(rate_limit_wait_seconds.clone()))
            .expect("register geocode_rate_limit_wait_seconds");
        registry
            .register(Box::new(match_requests_total.clone()))
            .expect("register match_requests_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(route_plans_total.clone()))
            .expect("register route_plans_total");
        registry
            .register(Box::new(route_plan_latency_seconds.clone()))
            .expect("register route_plan_latency_seconds");

        Self {
            registry,
            geocode_lookups_total,
            geocode_provider_calls_total,
            geocode_cache_entries,
            rate_limit_wait_seconds,
            match_requests_total,
            match_latency_seconds,
            route_plans_total,
            route_plan_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
