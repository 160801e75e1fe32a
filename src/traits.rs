//! Seams between the compliance engine and its collaborators.
//!
//! The engine itself is pure computation. Routing, address lookup, travel-time
//! estimation, and storage are reached only through these traits.

use crate::error::PlannerError;
use crate::model::{
    Coordinates, LogEntry, RouteData, RouteRecord, Stop, StopSchedule, Trip, TripId,
};

/// Computes a driving route through an ordered list of points.
pub trait RoutingProvider {
    fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<RouteData, PlannerError>;
}

/// Resolves a point to a human-readable address.
pub trait ReverseGeocoder {
    /// `Ok(None)` when the provider knows no address for the point.
    fn reverse(&self, point: Coordinates) -> Result<Option<String>, PlannerError>;
}

/// Estimates driving time between two stops.
pub trait TravelEstimator {
    fn driving_hours(&self, from: Coordinates, to: Coordinates) -> f64;
}

/// Persistence boundary for trips and everything hanging off them.
///
/// Implementations must make [`TripStore::replace_generated_stops`] and
/// [`TripStore::save_generated_log`] atomic: no reader may observe a partially
/// replaced stop set or a partially written log.
pub trait TripStore {
    fn trip(&self, id: TripId) -> Result<Trip, PlannerError>;

    fn save_trip(&self, trip: Trip) -> Result<(), PlannerError>;

    fn route(&self, id: TripId) -> Result<Option<RouteRecord>, PlannerError>;

    fn save_route(&self, record: RouteRecord) -> Result<(), PlannerError>;

    /// Stops ordered by `order`.
    fn stops(&self, id: TripId) -> Result<Vec<Stop>, PlannerError>;

    /// Swap all generated stops for `stops`, keeping manual ones. Returns the
    /// resulting stop set.
    fn replace_generated_stops(
        &self,
        id: TripId,
        stops: Vec<Stop>,
    ) -> Result<Vec<Stop>, PlannerError>;

    /// Insert a stop at its `order`. Manual stops remember the order they
    /// asked for across later regenerations.
    fn add_stop(&self, id: TripId, stop: Stop) -> Result<Stop, PlannerError>;

    fn log_entries(&self, id: TripId) -> Result<Vec<LogEntry>, PlannerError>;

    fn append_log_entry(&self, id: TripId, entry: LogEntry) -> Result<(), PlannerError>;

    /// Append a generated log and stamp stop arrival and departure times in
    /// one step.
    fn save_generated_log(
        &self,
        id: TripId,
        entries: Vec<LogEntry>,
        schedule: &[StopSchedule],
    ) -> Result<(), PlannerError>;
}
