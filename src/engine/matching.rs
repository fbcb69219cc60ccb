use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::engine::assignment::{solve, total_cost};
use crate::engine::cost::{build_batch_cost_matrix, build_cost_matrix, match_score, validate_quantity};
use crate::error::AppError;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::item::Item;
use crate::models::matching::{
    BatchAssignment, BatchOutcome, MatchRequest, MatchStrategy, ScoredMatch,
};

pub fn validate_request(request: &MatchRequest) -> Result<(), AppError> {
    validate_quantity(request.quantity)?;

    if let Some(max_distance) = request.max_distance {
        if !max_distance.is_finite() || max_distance < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "max_distance must be a non-negative number, got {max_distance}"
            )));
        }
    }

    Ok(())
}

/// Rejects pools larger than `max`; the assignment solver is cubic in their size.
pub fn ensure_pool_size(what: &str, len: usize, max: usize) -> Result<(), AppError> {
    if len > max {
        return Err(AppError::InvalidInput(format!(
            "too many {what}: {len} exceeds the limit of {max}"
        )));
    }
    Ok(())
}

/// Items eligible for `request`: same food type, positive quantity and, when both
/// an origin and `max_distance` are known, within range. Items without coordinates
/// are never excluded by distance.
pub fn candidates(items: &[Item], request: &MatchRequest, origin: Option<GeoPoint>) -> Vec<Item> {
    items
        .iter()
        .filter(|item| item.food_type == request.food_type && item.quantity > 0.0)
        .filter(|item| match (origin, request.max_distance, item.coordinates()) {
            (Some(origin), Some(max_distance), Some(point)) => {
                haversine_km(&origin, &point) <= max_distance
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Ranks `items` against `request`, best match first.
///
/// Both strategies score every candidate once and produce the same order; the
/// assignment strategy routes candidates through the square cost matrix first.
pub fn rank_matches(
    items: &[Item],
    request: &MatchRequest,
    origin: Option<GeoPoint>,
    strategy: MatchStrategy,
) -> Result<Vec<ScoredMatch>, AppError> {
    validate_request(request)?;

    let candidates = candidates(items, request, origin);
    if candidates.is_empty() {
        debug!(food_type = %request.food_type, "no candidate items for request");
        return Ok(Vec::new());
    }

    let mut scored: Vec<ScoredMatch> = match strategy {
        MatchStrategy::Direct => candidates
            .into_iter()
            .map(|item| ScoredMatch {
                score: match_score(request.quantity, item.quantity),
                item,
            })
            .collect(),
        MatchStrategy::Assignment => {
            let matrix = build_cost_matrix(&candidates, request)?;
            debug_assert!(matrix.is_square());
            solve(&matrix)
                .into_iter()
                .map(|assignment| {
                    let item = candidates[assignment.row].clone();
                    ScoredMatch {
                        score: match_score(request.quantity, item.quantity),
                        item,
                    }
                })
                .collect()
        }
    };

    let preferred = request.preferred_location.as_deref();
    scored.sort_by(|a, b| rank_order(a, b, preferred));

    if let Some(limit) = request.limit {
        scored.truncate(limit);
    }

    Ok(scored)
}

/// Score first, then items at the preferred location, sooner expiry, smaller quantity.
fn rank_order(a: &ScoredMatch, b: &ScoredMatch, preferred: Option<&str>) -> Ordering {
    let location_rank = |m: &ScoredMatch| match preferred {
        Some(location) if m.item.location == location => 0,
        _ => 1,
    };

    b.score
        .total_cmp(&a.score)
        .then_with(|| location_rank(a).cmp(&location_rank(b)))
        .then_with(|| a.item.expiry.cmp(&b.item.expiry))
        .then_with(|| a.item.quantity.total_cmp(&b.item.quantity))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Gives each request at most one distinct item, minimising total quantity deviation.
pub fn assign_batch(items: &[Item], requests: &[MatchRequest]) -> Result<BatchOutcome, AppError> {
    for request in requests {
        validate_request(request)?;
    }

    if requests.is_empty() {
        return Ok(BatchOutcome::default());
    }

    let matrix = build_batch_cost_matrix(requests, items)?;
    let solved = solve(&matrix);
    debug!(
        requests = requests.len(),
        items = items.len(),
        total_cost = total_cost(&solved),
        "batch assignment solved"
    );

    let assignments: Vec<BatchAssignment> = solved
        .into_iter()
        .filter(|assignment| assignment.cost.is_finite())
        .map(|assignment| {
            let item = items[assignment.col].clone();
            BatchAssignment {
                request_index: assignment.row,
                score: match_score(requests[assignment.row].quantity, item.quantity),
                cost: assignment.cost,
                item,
            }
        })
        .collect();

    let served: HashSet<usize> = assignments.iter().map(|a| a.request_index).collect();
    let unassigned_requests = (0..requests.len())
        .filter(|index| !served.contains(index))
        .collect();

    Ok(BatchOutcome {
        assignments,
        unassigned_requests,
    })
}
