use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geocode", get(geocode))
        .route("/geocode/sweep", post(sweep_cache))
}

#[derive(Deserialize)]
pub struct GeocodeQuery {
    pub address: String,
}

#[derive(Serialize)]
pub struct GeocodeResponse {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub purged: usize,
    pub remaining: usize,
}

async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, AppError> {
    if query.address.trim().is_empty() {
        return Err(AppError::InvalidInput("address cannot be empty".to_string()));
    }

    let point = state
        .geocoder
        .resolve(&query.address)
        .await
        .ok_or_else(|| AppError::NotFound(format!("address '{}' not found", query.address)))?;

    Ok(Json(GeocodeResponse {
        address: query.address.trim().to_string(),
        lat: point.lat,
        lng: point.lng,
    }))
}

async fn sweep_cache(State(state): State<Arc<AppState>>) -> Json<SweepResponse> {
    let purged = state.geocoder.sweep_expired();
    let remaining = state.geocoder.cache_len();
    info!(purged, remaining, "geocode cache swept on request");

    Json(SweepResponse { purged, remaining })
}
