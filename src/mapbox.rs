//! Mapbox Directions and reverse-geocoding client.

use serde::Deserialize;
use tracing::debug;

use crate::config::MapboxConfig;
use crate::error::PlannerError;
use crate::model::{Coordinates, RouteData};
use crate::osrm::{DirectionsRoute, coordinate_path, first_route};
use crate::traits::{ReverseGeocoder, RoutingProvider};

#[derive(Debug, Clone)]
pub struct MapboxClient {
    config: MapboxConfig,
    client: reqwest::blocking::Client,
}

impl MapboxClient {
    pub fn new(config: MapboxConfig) -> Result<Self, PlannerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        params: &[(&str, &str)],
    ) -> Result<T, PlannerError> {
        let response = self
            .client
            .get(url)
            .query(&[("access_token", self.config.access_token.as_str())])
            .query(params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlannerError::RoutingProvider(format!("Mapbox API error: {status} {body}")));
        }
        Ok(response.json::<T>()?)
    }
}

impl RoutingProvider for MapboxClient {
    fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<RouteData, PlannerError> {
        let url = format!(
            "{}/directions/v5/mapbox/{}/{}",
            self.config.base_url,
            self.config.profile,
            coordinate_path(origin, destination, waypoints)
        );
        debug!(waypoints = waypoints.len(), "requesting Mapbox directions");

        let params = [("geometries", "geojson"), ("overview", "full")];
        let body: DirectionsResponse = self.get(url, &params)?;
        first_route(body.routes)
    }
}

impl ReverseGeocoder for MapboxClient {
    fn reverse(&self, point: Coordinates) -> Result<Option<String>, PlannerError> {
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{:.6},{:.6}.json",
            self.config.base_url, point.lng, point.lat
        );
        let body: GeocodingResponse = self.get(url, &[("limit", "1")])?;
        Ok(body.place_name())
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<GeocodingFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodingFeature {
    place_name: Option<String>,
}

impl GeocodingResponse {
    fn place_name(self) -> Option<String> {
        self.features
            .into_iter()
            .find_map(|feature| feature.place_name)
    }
}
