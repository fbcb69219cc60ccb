use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use foodlink_dispatch::api;
use foodlink_dispatch::config::Config;
use foodlink_dispatch::error::AppError;
use foodlink_dispatch::geocode::sweeper::run_cache_sweeper;
use foodlink_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    if config.geocoding_api_key.is_empty() {
        tracing::warn!("GOOGLE_MAPS_API_KEY is not set; uncached addresses will not resolve");
    }

    let shared_state = Arc::new(AppState::from_config(&config)?);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_cache_sweeper(
        shared_state.geocoder.clone(),
        config.cache_sweep_interval,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        match_strategy = %config.match_strategy,
        route_strategy = %config.route_strategy,
        cache = config.geocode_cache_path.as_deref().unwrap_or("memory"),
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    shared_state.geocoder.flush_cache();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
