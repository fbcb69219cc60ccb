use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::matching::{assign_batch, ensure_pool_size, rank_matches, validate_request};
use crate::error::AppError;
use crate::models::item::Item;
use crate::models::matching::{BatchOutcome, MatchRequest, MatchStrategy, ScoredMatch};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches", post(find_matches))
        .route("/matches/batch", post(find_batch_matches))
}

#[derive(Deserialize)]
pub struct MatchPayload {
    pub request: MatchRequest,
    pub items: Vec<Item>,
    #[serde(default)]
    pub strategy: Option<MatchStrategy>,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub matches: Vec<ScoredMatch>,
}

#[derive(Deserialize)]
pub struct BatchPayload {
    pub requests: Vec<MatchRequest>,
    pub items: Vec<Item>,
}

async fn find_matches(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MatchPayload>,
) -> Result<Json<MatchResponse>, AppError> {
    let strategy = payload.strategy.unwrap_or(state.match_strategy);
    let MatchPayload { request, items, .. } = payload;

    if let Err(err) = validate_request(&request)
        .and_then(|_| ensure_pool_size("items", items.len(), state.max_match_items))
    {
        record_outcome(&state, "invalid");
        return Err(err);
    }

    let origin = match (&request.preferred_location, request.max_distance) {
        (Some(location), Some(_)) => state.geocoder.resolve(location).await,
        _ => None,
    };

    let item_count = items.len();
    let start = Instant::now();
    let (request, result) = run_blocking(move || {
        let result = rank_matches(&items, &request, origin, strategy);
        (request, result)
    })
    .await?;
    state
        .metrics
        .match_latency_seconds
        .with_label_values(&[strategy.as_str()])
        .observe(start.elapsed().as_secs_f64());

    let matches = match result {
        Ok(matches) => matches,
        Err(err) => {
            record_outcome(&state, "invalid");
            return Err(err);
        }
    };

    record_outcome(&state, if matches.is_empty() { "empty" } else { "matched" });
    info!(
        food_type = %request.food_type,
        quantity = request.quantity,
        strategy = %strategy,
        items = item_count,
        matches = matches.len(),
        "match request ranked"
    );

    Ok(Json(MatchResponse { matches }))
}

async fn find_batch_matches(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchPayload>,
) -> Result<Json<BatchOutcome>, AppError> {
    let BatchPayload { requests, items } = payload;

    if let Err(err) = ensure_pool_size("items", items.len(), state.max_match_items)
        .and_then(|_| ensure_pool_size("requests", requests.len(), state.max_match_items))
    {
        record_outcome(&state, "invalid");
        return Err(err);
    }

    let (request_count, item_count) = (requests.len(), items.len());
    let start = Instant::now();
    let result = run_blocking(move || assign_batch(&items, &requests)).await?;
    state
        .metrics
        .match_latency_seconds
        .with_label_values(&["batch"])
        .observe(start.elapsed().as_secs_f64());

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            record_outcome(&state, "invalid");
            return Err(err);
        }
    };

    record_outcome(&state, "batch");
    info!(
        requests = request_count,
        items = item_count,
        assigned = outcome.assignments.len(),
        unassigned = outcome.unassigned_requests.len(),
        "batch match assigned"
    );

    Ok(Json(outcome))
}

/// Solver work runs on the blocking pool, off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(format!("matching task failed: {err}")))
}

fn record_outcome(state: &AppState, outcome: &str) {
    state
        .metrics
        .match_requests_total
        .with_label_values(&[outcome])
        .inc();
}
