use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;

use crate::error::AppError;
use crate::geo::GeoPoint;

/// External service turning an address into coordinates.
///
/// `Ok(None)` means the provider answered but found nothing; `Err` means the
/// call itself failed. Neither is cached.
pub trait GeocodingProvider: Send + Sync {
    fn geocode<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>>;
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Only the first result of an "OK" response is used.
pub fn parse_geocode_response(response: GeocodeResponse) -> Result<Option<GeoPoint>, AppError> {
    match response.status.as_str() {
        "OK" => match response.results.first() {
            Some(result) => {
                let location = &result.geometry.location;
                GeoPoint::new(location.lat, location.lng)
                    .map(Some)
                    .map_err(|err| AppError::GeocodeUnavailable(err.to_string()))
            }
            None => Ok(None),
        },
        "ZERO_RESULTS" => Ok(None),
        other => Err(AppError::GeocodeUnavailable(format!(
            "provider returned status {other}"
        ))),
    }
}

/// Google Geocoding API client.
#[derive(Debug, Clone)]
pub struct GoogleGeocodingClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocodingClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build geocoding client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn fetch(&self, address: &str) -> Result<Option<GeoPoint>, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| AppError::GeocodeUnavailable(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::GeocodeUnavailable(format!(
                "provider responded with HTTP {}",
                response.status()
            )));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| AppError::GeocodeUnavailable(format!("invalid response body: {err}")))?;

        parse_geocode_response(parsed)
    }
}

impl GeocodingProvider for GoogleGeocodingClient {
    fn geocode<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<GeoPoint>, AppError>> {
        Box::pin(self.fetch(address))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ok_response_uses_first_result() {
        let parsed = parse_geocode_response(response(json!({
            "status": "OK",
            "results": [
                { "geometry": { "location": { "lat": 40.7128, "lng": -74.006 } } },
                { "geometry": { "location": { "lat": 1.0, "lng": 1.0 } } }
            ]
        })))
        .unwrap();

        assert_eq!(
            parsed,
            Some(GeoPoint {
                lat: 40.7128,
                lng: -74.006
            })
        );
    }

    #[test]
    fn zero_results_is_not_found() {
        let parsed = parse_geocode_response(response(json!({ "status": "ZERO_RESULTS" }))).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn ok_without_results_is_not_found() {
        let parsed =
            parse_geocode_response(response(json!({ "status": "OK", "results": [] }))).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn denied_request_is_an_error() {
        let parsed = parse_geocode_response(response(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })));
        assert!(matches!(parsed, Err(AppError::GeocodeUnavailable(_))));
    }
}
