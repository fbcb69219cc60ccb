use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    Vegetables,
    Fruits,
    Grains,
    Protein,
    Dairy,
    Prepared,
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FoodType::Vegetables => "vegetables",
            FoodType::Fruits => "fruits",
            FoodType::Grains => "grains",
            FoodType::Protein => "protein",
            FoodType::Dairy => "dairy",
            FoodType::Prepared => "prepared",
        };
        f.write_str(name)
    }
}

impl FromStr for FoodType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vegetables" => Ok(FoodType::Vegetables),
            "fruits" => Ok(FoodType::Fruits),
            "grains" => Ok(FoodType::Grains),
            "protein" => Ok(FoodType::Protein),
            "dairy" => Ok(FoodType::Dairy),
            "prepared" => Ok(FoodType::Prepared),
            other => Err(format!("unknown food type: {other}")),
        }
    }
}

/// A donated item as supplied by the query layer. Never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: f64,
    pub food_type: FoodType,
    pub expiry: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub donor_name: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl Item {
    /// Coordinates are only reported when both halves are present and in range.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).ok(),
            _ => None,
        }
    }
}
