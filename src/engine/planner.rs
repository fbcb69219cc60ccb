use std::collections::HashSet;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::routing::RouteClusterer;
use crate::error::AppError;
use crate::geocode::Geocoder;
use crate::models::route::{round_to, RoutePlan, RouteRequest, Stop, StopRequest, StopRole};

fn default_label(stop: &StopRequest) -> String {
    let name = stop.name.as_deref().unwrap_or(&stop.location);
    match stop.role {
        StopRole::Depot => "Current Location".to_string(),
        StopRole::Pickup => format!("Pickup: {name}"),
        StopRole::Delivery => format!("Delivery: {name}"),
    }
}

/// Geocodes the depot and every stop, clusters the resolvable stops and
/// totals the result. Stops that cannot be geocoded are left out and listed
/// in `unresolved`; an unresolvable depot fails the whole plan.
pub async fn plan_routes(
    geocoder: &Geocoder,
    clusterer: &RouteClusterer,
    request: &RouteRequest,
) -> Result<RoutePlan, AppError> {
    if request.depot_location.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "depot_location cannot be empty".to_string(),
        ));
    }
    if request.stops.iter().any(|stop| stop.role == StopRole::Depot) {
        return Err(AppError::InvalidInput(
            "stops must be pickups or deliveries".to_string(),
        ));
    }

    let depot_point = geocoder
        .resolve(&request.depot_location)
        .await
        .ok_or_else(|| {
            AppError::GeocodeUnavailable(format!(
                "depot location '{}' could not be geocoded",
                request.depot_location
            ))
        })?;
    let depot = Stop::depot(depot_point);

    let resolved = join_all(
        request
            .stops
            .iter()
            .map(|stop| geocoder.resolve(&stop.location)),
    )
    .await;

    let mut stops = Vec::with_capacity(request.stops.len());
    let mut unresolved = Vec::new();
    for (stop, point) in request.stops.iter().zip(resolved) {
        match point {
            Some(point) => stops.push(Stop {
                role: stop.role,
                point,
                job_id: stop.job_id,
                label: stop
                    .label
                    .clone()
                    .unwrap_or_else(|| default_label(stop)),
            }),
            None => {
                warn!(location = %stop.location, job_id = ?stop.job_id, "stop omitted: location not geocoded");
                unresolved.push(stop.location.clone());
            }
        }
    }

    let clusterer = match request.strategy {
        Some(strategy) => clusterer.with_strategy(strategy),
        None => clusterer.clone(),
    };
    let routes = clusterer.plan(&depot, stops);

    let total_distance_km: f64 = routes.iter().map(|route| route.distance_km).sum();
    let total_minutes: f64 = routes.iter().map(|route| route.estimated_minutes).sum();
    let deliveries_count = request
        .stops
        .iter()
        .filter_map(|stop| stop.job_id)
        .collect::<HashSet<_>>()
        .len();

    let plan = RoutePlan {
        id: Uuid::new_v4(),
        route_count: routes.len(),
        routes: routes.iter().map(|route| route.rounded()).collect(),
        total_distance_km: round_to(total_distance_km, 2),
        total_minutes: total_minutes.round(),
        deliveries_count,
        unresolved,
    };

    info!(
        plan_id = %plan.id,
        strategy = %clusterer.strategy,
        routes = plan.route_count,
        total_distance_km = plan.total_distance_km,
        unresolved = plan.unresolved.len(),
        "route plan built"
    );

    Ok(plan)
}
