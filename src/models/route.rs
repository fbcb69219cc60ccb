use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopRole {
    Depot,
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub role: StopRole,
    pub point: GeoPoint,
    #[serde(default)]
    pub job_id: Option<i64>,
    pub label: String,
}

impl Stop {
    pub fn depot(point: GeoPoint) -> Self {
        Self {
            role: StopRole::Depot,
            point,
            job_id: None,
            label: "Current Location".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub stops: Vec<Stop>,
    pub distance_km: f64,
    pub estimated_minutes: f64,
}

impl Route {
    /// Copy with figures rounded for display: kilometres to 2 places, minutes to whole.
    pub fn rounded(&self) -> Self {
        Self {
            stops: self.stops.clone(),
            distance_km: round_to(self.distance_km, 2),
            estimated_minutes: self.estimated_minutes.round(),
        }
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// At most one merge per stop; routes never exceed two stops.
    #[serde(alias = "pairwise")]
    PairwiseGreedy,
    /// Clarke-Wright end-to-end merging into longer routes.
    #[serde(alias = "chained")]
    ChainedGreedy,
}

impl ClusterStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStrategy::PairwiseGreedy => "pairwise",
            ClusterStrategy::ChainedGreedy => "chained",
        }
    }
}

impl fmt::Display for ClusterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pairwise" | "pairwise_greedy" => Ok(ClusterStrategy::PairwiseGreedy),
            "chained" | "chained_greedy" => Ok(ClusterStrategy::ChainedGreedy),
            other => Err(format!("unknown route strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub role: StopRole,
    pub location: String,
    /// Donation name shown in the default label; the location is used when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub depot_location: String,
    pub stops: Vec<StopRequest>,
    #[serde(default)]
    pub strategy: Option<ClusterStrategy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub id: Uuid,
    pub routes: Vec<Route>,
    pub total_distance_km: f64,
    pub total_minutes: f64,
    pub route_count: usize,
    pub deliveries_count: usize,
    pub unresolved: Vec<String>,
}
