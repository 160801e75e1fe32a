//! OSRM HTTP adapter for route directions.

use serde::Deserialize;
use tracing::debug;

use crate::error::PlannerError;
use crate::model::{Coordinates, RouteData};
use crate::polyline::GeoJsonLineString;
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl RoutingProvider for OsrmClient {
    fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<RouteData, PlannerError> {
        let url = format!(
            "{}/route/v1/{}/{}",
            self.config.base_url,
            self.config.profile,
            coordinate_path(origin, destination, waypoints)
        );
        debug!(%url, "requesting OSRM route");

        let body = self
            .client
            .get(url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()?
            .error_for_status()?
            .json::<OsrmRouteResponse>()?;

        if body.code != "Ok" {
            return Err(PlannerError::RoutingProvider(format!(
                "OSRM returned {}: {}",
                body.code,
                body.message.unwrap_or_default()
            )));
        }
        first_route(body.routes)
    }
}

/// `lng,lat` pairs joined by `;`: origin, waypoints, destination.
pub(crate) fn coordinate_path(
    origin: Coordinates,
    destination: Coordinates,
    waypoints: &[Coordinates],
) -> String {
    std::iter::once(&origin)
        .chain(waypoints)
        .chain(std::iter::once(&destination))
        .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

/// Route object shared by OSRM and Mapbox directions responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsRoute {
    distance: f64,
    duration: f64,
    geometry: GeoJsonLineString,
}

pub(crate) fn first_route(routes: Vec<DirectionsRoute>) -> Result<RouteData, PlannerError> {
    let route = routes
        .into_iter()
        .next()
        .ok_or_else(|| PlannerError::RoutingProvider("no route for given locations".to_string()))?;
    Ok(RouteData {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        geometry: route.geometry.into(),
    })
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_path_orders_waypoints() {
        let path = coordinate_path(
            Coordinates::new(33.4484, -112.074),
            Coordinates::new(32.2226, -110.9747),
            &[Coordinates::new(33.0, -111.5)],
        );
        assert_eq!(
            path,
            "-112.074000,33.448400;-111.500000,33.000000;-110.974700,32.222600"
        );
    }

    #[test]
    fn test_parse_route_response() {
        let body: OsrmRouteResponse = serde_json::from_str(
            r#"{
                "code": "Ok",
                "routes": [{
                    "distance": 187000.5,
                    "duration": 6300.0,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-112.074, 33.4484], [-110.9747, 32.2226]]
                    }
                }],
                "waypoints": []
            }"#,
        )
        .unwrap();
        let route = first_route(body.routes).unwrap();
        assert_eq!(route.distance_meters, 187000.5);
        assert_eq!(route.duration_hours(), 1.75);
        assert_eq!(route.geometry.len(), 2);
    }

    #[test]
    fn test_empty_routes_is_error() {
        let json = r#"{"code": "NoRoute", "message": "Impossible route"}"#;
        let body: OsrmRouteResponse = serde_json::from_str(json).unwrap();
        assert!(body.routes.is_empty());
        assert!(matches!(
            first_route(body.routes),
            Err(PlannerError::RoutingProvider(_))
        ));
    }
}
