//! Savings-based route clustering around a depot.
//!
//! `s(i, j) = d(depot, i) + d(depot, j) - d(i, j)` is the distance saved by
//! serving `i` and `j` on one route instead of two depot round-trips. Pairs are
//! considered in decreasing order of saving; only strictly positive savings merge.

use crate::geo::haversine_km;
use crate::models::route::{ClusterStrategy, Route, Stop};

const SAVING_EPSILON_KM: f64 = 1e-9;

#[derive(Debug)]
struct Saving {
    i: usize,
    j: usize,
    value: f64,
}

fn savings(depot: &Stop, stops: &[Stop]) -> Vec<Saving> {
    let from_depot: Vec<f64> = stops
        .iter()
        .map(|stop| haversine_km(&depot.point, &stop.point))
        .collect();

    let mut savings = Vec::with_capacity(stops.len() * stops.len().saturating_sub(1) / 2);
    for i in 0..stops.len() {
        for j in (i + 1)..stops.len() {
            let value =
                from_depot[i] + from_depot[j] - haversine_km(&stops[i].point, &stops[j].point);
            if value > SAVING_EPSILON_KM {
                savings.push(Saving { i, j, value });
            }
        }
    }

    // Stable sort: equal savings keep (i, j) generation order.
    savings.sort_by(|a, b| b.value.total_cmp(&a.value));
    savings
}

/// Groups `stops` into routes. Every input stop appears in exactly one route.
pub fn cluster(
    depot: &Stop,
    stops: Vec<Stop>,
    strategy: ClusterStrategy,
    max_stops_per_route: Option<usize>,
) -> Vec<Vec<Stop>> {
    if stops.is_empty() {
        return Vec::new();
    }
    if stops.len() <= 2 {
        return vec![stops];
    }

    let groups = match strategy {
        ClusterStrategy::PairwiseGreedy => pairwise_groups(depot, &stops),
        ClusterStrategy::ChainedGreedy => chained_groups(depot, &stops, max_stops_per_route),
    };

    let mut slots: Vec<Option<Stop>> = stops.into_iter().map(Some).collect();
    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .filter_map(|index| slots[index].take())
                .collect::<Vec<Stop>>()
        })
        .collect()
}

/// One merge per stop at most: the highest-saving unclaimed pair becomes a
/// two-stop route, leftovers become single-stop routes.
fn pairwise_groups(depot: &Stop, stops: &[Stop]) -> Vec<Vec<usize>> {
    let mut claimed = vec![false; stops.len()];
    let mut groups = Vec::new();

    for saving in savings(depot, stops) {
        if !claimed[saving.i] && !claimed[saving.j] {
            claimed[saving.i] = true;
            claimed[saving.j] = true;
            groups.push(vec![saving.i, saving.j]);
        }
    }

    groups.extend(
        claimed
            .iter()
            .enumerate()
            .filter(|(_, claimed)| !**claimed)
            .map(|(index, _)| vec![index]),
    );
    groups
}

/// Clarke-Wright: routes grow by joining an end of one route to an end of another.
fn chained_groups(depot: &Stop, stops: &[Stop], max_stops: Option<usize>) -> Vec<Vec<usize>> {
    let n = stops.len();
    let mut route_of: Vec<usize> = (0..n).collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for saving in savings(depot, stops) {
        let ri = route_of[saving.i];
        let rj = route_of[saving.j];
        if ri == rj {
            continue;
        }

        let combined = members[ri].len() + members[rj].len();
        if max_stops.is_some_and(|max| combined > max) {
            continue;
        }

        let i_at_start = members[ri].first() == Some(&saving.i);
        let i_at_end = members[ri].last() == Some(&saving.i);
        let j_at_start = members[rj].first() == Some(&saving.j);
        let j_at_end = members[rj].last() == Some(&saving.j);

        let (into, from, reverse_into, reverse_from) = if i_at_end && j_at_start {
            (ri, rj, false, false)
        } else if j_at_end && i_at_start {
            (rj, ri, false, false)
        } else if i_at_end && j_at_end {
            (ri, rj, false, true)
        } else if i_at_start && j_at_start {
            (ri, rj, true, false)
        } else {
            continue;
        };

        let mut moved = std::mem::take(&mut members[from]);
        if reverse_from {
            moved.reverse();
        }
        if reverse_into {
            members[into].reverse();
        }
        members[into].append(&mut moved);

        for &stop in &members[into] {
            route_of[stop] = into;
        }
    }

    members.into_iter().filter(|m| !m.is_empty()).collect()
}

/// Distance over consecutive stops and travel time at `average_speed_kmh`.
pub fn build_route(stops: Vec<Stop>, average_speed_kmh: f64) -> Route {
    let distance_km: f64 = stops
        .windows(2)
        .map(|pair| haversine_km(&pair[0].point, &pair[1].point))
        .sum();

    Route {
        estimated_minutes: distance_km / average_speed_kmh * 60.0,
        distance_km,
        stops,
    }
}

#[derive(Debug, Clone)]
pub struct RouteClusterer {
    pub strategy: ClusterStrategy,
    pub average_speed_kmh: f64,
    pub max_stops_per_route: Option<usize>,
}

impl Default for RouteClusterer {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategy::PairwiseGreedy,
            average_speed_kmh: 30.0,
            max_stops_per_route: None,
        }
    }
}

impl RouteClusterer {
    pub fn with_strategy(&self, strategy: ClusterStrategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    pub fn plan(&self, depot: &Stop, stops: Vec<Stop>) -> Vec<Route> {
        cluster(depot, stops, self.strategy, self.max_stops_per_route)
            .into_iter()
            .map(|group| build_route(group, self.average_speed_kmh))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::route::StopRole;

    fn stop(label: &str, lat: f64, lng: f64) -> Stop {
        Stop {
            role: StopRole::Pickup,
            point: GeoPoint { lat, lng },
            job_id: None,
            label: label.to_string(),
        }
    }

    fn depot() -> Stop {
        Stop::depot(GeoPoint { lat: 0.0, lng: 0.0 })
    }

    fn labels(routes: &[Vec<Stop>]) -> Vec<Vec<&str>> {
        routes
            .iter()
            .map(|route| route.iter().map(|s| s.label.as_str()).collect())
            .collect()
    }

    fn assert_each_stop_once(input: &[Stop], routes: &[Vec<Stop>]) {
        let mut seen: Vec<&str> = routes.iter().flatten().map(|s| s.label.as_str()).collect();
        let mut expected: Vec<&str> = input.iter().map(|s| s.label.as_str()).collect();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn no_stops_no_routes() {
        assert!(cluster(&depot(), Vec::new(), ClusterStrategy::PairwiseGreedy, None).is_empty());
    }

    #[test]
    fn two_stops_form_one_trivial_route() {
        let stops = vec![stop("A", 0.0, 1.0), stop("B", 0.0, -1.0)];
        let routes = cluster(&depot(), stops, ClusterStrategy::PairwiseGreedy, None);
        assert_eq!(labels(&routes), vec![vec!["A", "B"]]);
    }

    #[test]
    fn opposite_stops_stay_apart_and_close_stops_merge() {
        let stops = vec![
            stop("A", 0.0, 1.0),
            stop("B", 0.0, -1.0),
            stop("A2", 0.01, 1.0),
        ];

        let routes = cluster(&depot(), stops.clone(), ClusterStrategy::PairwiseGreedy, None);

        assert_eq!(labels(&routes), vec![vec!["A", "A2"], vec!["B"]]);
        assert_each_stop_once(&stops, &routes);
    }

    #[test]
    fn pairwise_never_builds_routes_longer_than_two() {
        let stops: Vec<Stop> = (0..7)
            .map(|i| stop(&format!("S{i}"), 1.0 + i as f64 * 0.01, 1.0))
            .collect();

        let routes = cluster(&depot(), stops.clone(), ClusterStrategy::PairwiseGreedy, None);

        assert!(routes.iter().all(|route| route.len() <= 2));
        assert_eq!(routes.len(), 4);
        assert_each_stop_once(&stops, &routes);
    }

    #[test]
    fn chained_joins_a_line_of_stops_into_one_route() {
        let stops: Vec<Stop> = (0..5)
            .map(|i| stop(&format!("S{i}"), 1.0 + i as f64 * 0.01, 1.0))
            .collect();

        let routes = cluster(&depot(), stops.clone(), ClusterStrategy::ChainedGreedy, None);

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].len(), 5);
        assert_each_stop_once(&stops, &routes);
    }

    #[test]
    fn chained_respects_max_stops_per_route() {
        let stops: Vec<Stop> = (0..6)
            .map(|i| stop(&format!("S{i}"), 1.0 + i as f64 * 0.01, 1.0))
            .collect();

        let routes = cluster(&depot(), stops.clone(), ClusterStrategy::ChainedGreedy, Some(3));

        assert!(routes.iter().all(|route| route.len() <= 3));
        assert_each_stop_once(&stops, &routes);
    }

    #[test]
    fn route_time_assumes_thirty_kmh() {
        let route = build_route(vec![stop("A", 0.0, 0.0), stop("B", 0.0, 1.0)], 30.0);

        assert!((route.distance_km - 111.19).abs() < 0.01);
        assert!((route.estimated_minutes - route.distance_km * 2.0).abs() < 1e-9);
    }

    #[test]
    fn single_stop_route_has_no_distance() {
        let route = build_route(vec![stop("A", 10.0, 10.0)], 30.0);
        assert_eq!(route.distance_km, 0.0);
        assert_eq!(route.estimated_minutes, 0.0);
    }

    #[test]
    fn clusterer_plans_routes_with_configured_strategy() {
        let stops: Vec<Stop> = (0..4)
            .map(|i| stop(&format!("S{i}"), 1.0 + i as f64 * 0.01, 1.0))
            .collect();
        let clusterer = RouteClusterer::default();

        let pairwise = clusterer.plan(&depot(), stops.clone());
        let chained = clusterer
            .with_strategy(ClusterStrategy::ChainedGreedy)
            .plan(&depot(), stops);

        assert_eq!(pairwise.len(), 2);
        assert_eq!(chained.len(), 1);
        assert!(chained[0].distance_km > 0.0);
    }
}
