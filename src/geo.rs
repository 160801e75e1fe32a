//! Great-circle distance and interpolation along route geometry.

use crate::error::PlannerError;
use crate::model::Coordinates;
use crate::polyline::RoutePolyline;
use crate::traits::ReverseGeocoder;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two `(lng, lat)` points in degrees.
pub fn distance_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lng1, lat1) = from;
    let (lng2, lat2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

pub fn distance_between(from: Coordinates, to: Coordinates) -> f64 {
    distance_meters(from.lng_lat(), to.lng_lat())
}

/// Total length of the polyline in meters.
pub fn route_length_meters(polyline: &RoutePolyline) -> f64 {
    polyline
        .points()
        .windows(2)
        .map(|pair| distance_meters(pair[0], pair[1]))
        .sum()
}

/// Point reached after covering `fraction` of the route's length.
///
/// Interpolation between the bracketing vertices is linear in degrees, which
/// is accurate enough for the short segments real route geometry consists of.
pub fn position_at_fraction(
    polyline: &RoutePolyline,
    fraction: f64,
) -> Result<Coordinates, PlannerError> {
    let points = polyline.points();
    if points.len() < 2 {
        return Err(PlannerError::RouteDataMissing(format!(
            "route geometry has {} point(s), need at least 2",
            points.len()
        )));
    }
    if !fraction.is_finite() {
        return Err(PlannerError::Validation(format!("route fraction {fraction} is not finite")));
    }
    let fraction = fraction.clamp(0.0, 1.0);

    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(total);
    for pair in points.windows(2) {
        total += distance_meters(pair[0], pair[1]);
        cumulative.push(total);
    }

    let target = fraction * total;
    for (i, pair) in points.windows(2).enumerate() {
        let (seg_start, seg_end) = (cumulative[i], cumulative[i + 1]);
        if target > seg_end {
            continue;
        }
        let seg_len = seg_end - seg_start;
        if seg_len <= 0.0 {
            return Ok(Coordinates::from_lng_lat(pair[0]));
        }
        let t = (target - seg_start) / seg_len;
        let (lng1, lat1) = pair[0];
        let (lng2, lat2) = pair[1];
        return Ok(Coordinates::new(lat1 + t * (lat2 - lat1), lng1 + t * (lng2 - lng1)));
    }

    // Float error can push the target just past the final cumulative sum.
    Ok(Coordinates::from_lng_lat(points[points.len() - 1]))
}

/// Geocoder that never knows an address. Interpolated stops fall back to the
/// placeholder address.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeocoder;

impl ReverseGeocoder for NullGeocoder {
    fn reverse(&self, _point: Coordinates) -> Result<Option<String>, PlannerError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DALLAS: (f64, f64) = (-96.797, 32.7767);
    const HOUSTON: (f64, f64) = (-95.3698, 29.7604);

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} != {b} (tol {tol})");
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(distance_meters(DALLAS, DALLAS), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let pairs = [
            (DALLAS, HOUSTON),
            ((0.0, 0.0), (179.9, -45.0)),
            ((-120.5, 47.1), (-70.2, 41.3)),
        ];
        for (a, b) in pairs {
            assert_close(distance_meters(a, b), distance_meters(b, a), 1e-6);
        }
    }

    #[test]
    fn test_known_distance() {
        // Dallas to Houston is ~362 km as the crow flies.
        let km = distance_meters(DALLAS, HOUSTON) / 1000.0;
        assert!(
            km > 350.0 && km < 375.0,
            "Dallas to Houston should be ~362km, got {km}"
        );
    }

    #[test]
    fn test_fraction_boundaries() {
        let route = RoutePolyline::new(vec![DALLAS, (-96.0, 31.5), HOUSTON]);
        let start = position_at_fraction(&route, 0.0).unwrap();
        let end = position_at_fraction(&route, 1.0).unwrap();
        assert_close(start.lng, DALLAS.0, 1e-9);
        assert_close(start.lat, DALLAS.1, 1e-9);
        assert_close(end.lng, HOUSTON.0, 1e-9);
        assert_close(end.lat, HOUSTON.1, 1e-9);
    }

    #[test]
    fn test_fraction_midpoint_of_straight_segment() {
        let route = RoutePolyline::new(vec![(0.0, 0.0), (0.0, 2.0)]);
        let mid = position_at_fraction(&route, 0.5).unwrap();
        assert_close(mid.lat, 1.0, 1e-9);
        assert_close(mid.lng, 0.0, 1e-9);
    }

    #[test]
    fn test_fraction_lands_in_later_segment() {
        // Two equal-length legs along the equator.
        let route = RoutePolyline::new(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let point = position_at_fraction(&route, 0.75).unwrap();
        assert_close(point.lng, 1.5, 1e-9);
    }

    #[test]
    fn test_fraction_requires_two_points() {
        let empty = RoutePolyline::new(vec![]);
        let single = RoutePolyline::new(vec![DALLAS]);
        assert!(matches!(
            position_at_fraction(&empty, 0.5),
            Err(PlannerError::RouteDataMissing(_))
        ));
        assert!(matches!(
            position_at_fraction(&single, 0.5),
            Err(PlannerError::RouteDataMissing(_))
        ));
    }

    #[test]
    fn test_fraction_skips_duplicate_vertices() {
        let route = RoutePolyline::new(vec![(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let start = position_at_fraction(&route, 0.0).unwrap();
        assert_eq!(start, Coordinates::new(0.0, 0.0));
        let end = position_at_fraction(&route, 1.0).unwrap();
        assert_close(end.lat, 1.0, 1e-9);
    }

    #[test]
    fn test_route_length_sums_segments() {
        let route = RoutePolyline::new(vec![DALLAS, HOUSTON, DALLAS]);
        assert_close(
            route_length_meters(&route),
            2.0 * distance_meters(DALLAS, HOUSTON),
            1e-6,
        );
    }
}
