//! Route geometry as returned by the routing providers.
//!
//! Providers answer with GeoJSON `LineString` geometry, whose coordinates are
//! `[lng, lat]` pairs. The core keeps that ordering and never mutates it.

use serde::{Deserialize, Serialize};

/// Ordered `(lng, lat)` vertices of a trip's route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePolyline {
    points: Vec<(f64, f64)>,
}

impl RoutePolyline {
    /// Each point is a (longitude, latitude) tuple.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// At least two vertices are needed to interpolate along the route.
    pub fn is_routable(&self) -> bool {
        self.points.len() >= 2
    }
}

/// GeoJSON `LineString` geometry as found in directions responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoJsonLineString {
    pub coordinates: Vec<[f64; 2]>,
}

impl From<GeoJsonLineString> for RoutePolyline {
    fn from(line: GeoJsonLineString) -> Self {
        Self::new(
            line.coordinates
                .into_iter()
                .map(|[lng, lat]| (lng, lat))
                .collect(),
        )
    }
}
