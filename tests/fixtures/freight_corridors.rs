//! Real city coordinates along US freight corridors.
//!
//! Coordinates are city centers from OpenStreetMap. Polylines are coarse:
//! one vertex per major city, enough for interpolation tests.

use hos_planner::model::Location;
use hos_planner::polyline::RoutePolyline;

/// A named city with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl City {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.name, self.lat, self.lng)
    }

    pub fn lng_lat(&self) -> (f64, f64) {
        (self.lng, self.lat)
    }
}

// ============================================================================
// I-40: Barstow, CA to Oklahoma City, OK
// ============================================================================

pub const I40: &[City] = &[
    City::new("Barstow, CA", 34.8958, -117.0173),
    City::new("Needles, CA", 34.8480, -114.6141),
    City::new("Kingman, AZ", 35.1894, -114.0530),
    City::new("Flagstaff, AZ", 35.1983, -111.6513),
    City::new("Gallup, NM", 35.5281, -108.7426),
    City::new("Albuquerque, NM", 35.0844, -106.6504),
    City::new("Tucumcari, NM", 35.1717, -103.7250),
    City::new("Amarillo, TX", 35.2220, -101.8313),
    City::new("Oklahoma City, OK", 35.4676, -97.5164),
];

/// Driver's home terminal, a short hop from the pickup.
pub const LOS_ANGELES_YARD: City = City::new("Los Angeles, CA", 34.0522, -118.2437);

pub fn i40_polyline() -> RoutePolyline {
    RoutePolyline::new(I40.iter().map(City::lng_lat).collect())
}

pub fn i40_pickup() -> City {
    I40[0]
}

pub fn i40_dropoff() -> City {
    I40[I40.len() - 1]
}

// ============================================================================
// I-10: Phoenix to Tucson (inside the Arizona OSRM extract)
// ============================================================================

pub const PHOENIX: City = City::new("Phoenix, AZ", 33.4484, -112.0740);
pub const CASA_GRANDE: City = City::new("Casa Grande, AZ", 32.8795, -111.7574);
pub const TUCSON: City = City::new("Tucson, AZ", 32.2226, -110.9747);
