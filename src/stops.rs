//! Stop planning: pickup, fueling, rest, and dropoff stops along a trip.

use tracing::{debug, warn};

use crate::config::{HosRules, RouteOrdering, StopPolicy};
use crate::error::PlannerError;
use crate::geo;
use crate::model::{Coordinates, Location, Stop, StopType, Trip, hours_to_delta};
use crate::polyline::RoutePolyline;
use crate::traits::ReverseGeocoder;

/// Address given to interpolated stops the geocoder could not resolve.
pub const UNKNOWN_ADDRESS: &str = "Unknown location";

/// A stop before orders are assigned, tagged with its position on the route.
#[derive(Debug, Clone)]
struct PlannedStop {
    fraction: f64,
    stop: Stop,
}

/// Derive the mandatory stops for a trip from its estimates and route.
///
/// Returns stops with orders `1..=n`, pickup first and dropoff last.
///
/// # Errors
///
/// - [`PlannerError::RouteDataMissing`] if a fueling or rest stop must be
///   placed but `route` is absent or has fewer than two points.
/// - [`PlannerError::Validation`] if strict feasibility is enabled and the
///   stop set leaves a gap longer than the daily driving cap.
pub fn plan_stops<G: ReverseGeocoder>(
    trip: &Trip,
    route: Option<&RoutePolyline>,
    geocoder: &G,
    policy: &StopPolicy,
    rules: &HosRules,
) -> Result<Vec<Stop>, PlannerError> {
    let mut fueling = Vec::new();
    if let Some(distance) = trip.estimated_distance() {
        let count = interval_count(distance, policy.fuel_interval_miles);
        for i in 1..=count {
            let fraction = f64::from(i) * policy.fuel_interval_miles / distance;
            let location = interpolated_location(route, fraction, geocoder)?;
            let duration = Some(hours_to_delta(policy.fueling_hours));
            fueling.push(PlannedStop {
                fraction,
                stop: Stop::generated(location, StopType::Fueling, duration),
            });
        }
    }

    let mut rests = Vec::new();
    if let Some(duration) = trip.estimated_duration() {
        let count = interval_count(duration, policy.rest_interval_hours);
        for i in 1..=count {
            let fraction = f64::from(i) * policy.rest_interval_hours / duration;
            let location = interpolated_location(route, fraction, geocoder)?;
            rests.push(PlannedStop {
                fraction,
                stop: Stop::generated(location, StopType::Rest, None),
            });
        }
    }

    let mut intermediate: Vec<PlannedStop> = fueling.into_iter().chain(rests).collect();
    if policy.ordering == RouteOrdering::RoutePosition {
        // Stable, so a fueling and rest stop at the same point keep fueling first.
        intermediate.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
    }

    let mut planned = Vec::with_capacity(intermediate.len() + 2);
    planned.push(PlannedStop {
        fraction: 0.0,
        stop: Stop::generated(
            trip.pickup_location.clone(),
            StopType::Pickup,
            Some(hours_to_delta(policy.pickup_hours)),
        ),
    });
    planned.extend(intermediate);
    planned.push(PlannedStop {
        fraction: 1.0,
        stop: Stop::generated(
            trip.dropoff_location.clone(),
            StopType::Dropoff,
            Some(hours_to_delta(policy.dropoff_hours)),
        ),
    });

    check_feasibility(trip, &planned, policy, rules)?;

    let stops = planned
        .into_iter()
        .zip(1..)
        .map(|(planned, order)| Stop {
            order,
            ..planned.stop
        })
        .collect::<Vec<_>>();

    debug!(trip_id = %trip.id, stops = stops.len(), "planned stops");
    Ok(stops)
}

/// Number of complete intervals covered by `total`.
fn interval_count(total: f64, interval: f64) -> u32 {
    if total <= 0.0 || interval <= 0.0 {
        return 0;
    }
    (total / interval).floor() as u32
}

fn interpolated_location<G: ReverseGeocoder>(
    route: Option<&RoutePolyline>,
    fraction: f64,
    geocoder: &G,
) -> Result<Location, PlannerError> {
    let route = route.ok_or_else(|| {
        PlannerError::RouteDataMissing("stop interpolation requires route geometry".to_string())
    })?;
    let coordinates = geo::position_at_fraction(route, fraction)?;
    Ok(Location {
        address: resolve_address(geocoder, coordinates),
        coordinates,
    })
}

/// Reverse-geocode a point, degrading to [`UNKNOWN_ADDRESS`] on any failure.
pub fn resolve_address<G: ReverseGeocoder>(geocoder: &G, point: Coordinates) -> String {
    match geocoder.reverse(point) {
        Ok(Some(address)) => address,
        Ok(None) => UNKNOWN_ADDRESS.to_string(),
        Err(err) => {
            warn!(lat = point.lat, lng = point.lng, error = %err, "reverse geocoding failed");
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

fn check_feasibility(
    trip: &Trip,
    planned: &[PlannedStop],
    policy: &StopPolicy,
    rules: &HosRules,
) -> Result<(), PlannerError> {
    let Some(duration) = trip.estimated_duration() else {
        return Ok(());
    };
    if !policy.strict_feasibility {
        debug!(trip_id = %trip.id, "accepting stop set without feasibility check");
        return Ok(());
    }

    for (i, pair) in planned.windows(2).enumerate() {
        let gap_hours = (pair[1].fraction - pair[0].fraction).abs() * duration;
        if gap_hours > rules.max_driving_hours {
            return Err(PlannerError::Validation(format!(
                "{gap_hours:.1} hours of driving between stops {} and {} exceeds the {}-hour limit",
                i + 1,
                i + 2,
                rules.max_driving_hours
            )));
        }
    }
    Ok(())
}
