use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::engine::planner::plan_routes;
use crate::error::AppError;
use crate::models::route::{RoutePlan, RouteRequest};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/routes", post(optimize_routes))
}

async fn optimize_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RoutePlan>, AppError> {
    let strategy = request.strategy.unwrap_or(state.clusterer.strategy);

    let start = Instant::now();
    let result = plan_routes(&state.geocoder, &state.clusterer, &request).await;
    state
        .metrics
        .route_plan_latency_seconds
        .with_label_values(&[strategy.as_str()])
        .observe(start.elapsed().as_secs_f64());

    let outcome = match &result {
        Ok(_) => "planned",
        Err(AppError::GeocodeUnavailable(_)) => "depot_unresolved",
        Err(_) => "invalid",
    };
    state
        .metrics
        .route_plans_total
        .with_label_values(&[outcome])
        .inc();

    result.map(Json)
}
