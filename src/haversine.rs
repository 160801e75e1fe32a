//! Straight-line driving-time estimator.
//!
//! Uses great-circle distance between stops and an assumed average speed.
//! Ignores the road network, so it underestimates real driving on winding
//! routes, but needs no provider round-trip per leg.

use crate::geo;
use crate::model::{Coordinates, METERS_PER_MILE};
use crate::traits::TravelEstimator;

const DEFAULT_SPEED_MPH: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct HaversineEstimator {
    /// Assumed average driving speed in miles per hour.
    pub speed_mph: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            speed_mph: DEFAULT_SPEED_MPH,
        }
    }
}

impl HaversineEstimator {
    pub fn new(speed_mph: f64) -> Self {
        Self { speed_mph }
    }

    fn miles_between(from: Coordinates, to: Coordinates) -> f64 {
        geo::distance_between(from, to) / METERS_PER_MILE
    }
}

impl TravelEstimator for HaversineEstimator {
    fn driving_hours(&self, from: Coordinates, to: Coordinates) -> f64 {
        Self::miles_between(from, to) / self.speed_mph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_takes_no_time() {
        let here = Coordinates::new(36.1, -115.1);
        let estimator = HaversineEstimator::default();
        assert_eq!(estimator.driving_hours(here, here), 0.0);
    }

    #[test]
    fn test_known_leg() {
        // Phoenix to Tucson, ~108 straight-line miles.
        let phoenix = Coordinates::new(33.4484, -112.074);
        let tucson = Coordinates::new(32.2226, -110.9747);
        let miles = HaversineEstimator::miles_between(phoenix, tucson);
        assert!(
            miles > 100.0 && miles < 116.0,
            "Phoenix to Tucson should be ~108mi, got {miles}"
        );
    }

    #[test]
    fn test_hours_scale_with_speed() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        let fast = HaversineEstimator::new(60.0).driving_hours(a, b);
        let slow = HaversineEstimator::new(30.0).driving_hours(a, b);
        assert!((slow - 2.0 * fast).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let estimator = HaversineEstimator::default();
        let a = Coordinates::new(36.17, -115.14);
        let b = Coordinates::new(34.05, -118.24);
        let there = estimator.driving_hours(a, b);
        let back = estimator.driving_hours(b, a);
        assert!((there - back).abs() < 1e-12);
    }
}
