use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::item::{FoodType, Item};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Sort candidates by score directly.
    Direct,
    /// Run candidates through the square cost matrix and the assignment solver.
    Assignment,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Direct => "direct",
            MatchStrategy::Assignment => "assignment",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(MatchStrategy::Direct),
            "assignment" => Ok(MatchStrategy::Assignment),
            other => Err(format!("unknown match strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub food_type: FoodType,
    pub quantity: f64,
    #[serde(default)]
    pub preferred_location: Option<String>,
    /// Kilometres from the preferred location.
    #[serde(default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub item: Item,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAssignment {
    pub request_index: usize,
    pub item: Item,
    pub score: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub assignments: Vec<BatchAssignment>,
    pub unassigned_requests: Vec<usize>,
}
