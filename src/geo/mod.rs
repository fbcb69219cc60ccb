use serde::{Deserialize, Serialize};

use crate::error::AppError;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "malformed coordinates: ({lat}, {lng})"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::InvalidInput(format!(
                "coordinates out of range: ({lat}, {lng})"
            )));
        }
        Ok(Self { lat, lng })
    }
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).max(0.0).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Great-circle distance in kilometres between two raw latitude/longitude pairs.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(
        &GeoPoint {
            lat: lat1,
            lng: lon1,
        },
        &GeoPoint {
            lat: lat2,
            lng: lon2,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{distance, haversine_km, GeoPoint};

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 40.7128,
            lng: -74.0060,
        };
        let distance = haversine_km(&p, &p);
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn new_york_to_philadelphia_is_around_130_km() {
        let distance = distance(40.7128, -74.0060, 39.9526, -75.1652);
        assert!((distance - 130.0).abs() < 5.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ((40.7128, -74.0060), (34.0522, -118.2437)),
            ((-33.8688, 151.2093), (51.5074, -0.1278)),
            ((0.0, 179.9), (0.0, -179.9)),
        ];

        for ((lat1, lon1), (lat2, lon2)) in pairs {
            assert_eq!(distance(lat1, lon1, lat2, lon2), distance(lat2, lon2, lat1, lon1));
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let distance = distance(0.0, 0.0, 0.0, 1.0);
        assert!((distance - 111.19).abs() < 0.01);
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }
}
