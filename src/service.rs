//! Caller-facing trip operations.
//!
//! `TripPlanner` ties the pure engine to its collaborators: it fetches routes,
//! regenerates stops, generates and persists duty logs, and runs compliance
//! checks. Request handling and serialization stay with the caller.

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{HosRules, StopPolicy};
use crate::duty_log::{self, DutyLog, GenerationMode};
use crate::error::PlannerError;
use crate::haversine::HaversineEstimator;
use crate::model::{LogEntry, RouteData, RouteRecord, Stop, StopSchedule, StopSource, TripId};
use crate::stops;
use crate::traits::{ReverseGeocoder, RoutingProvider, TripStore};
use crate::validator::{self, ComplianceReport, DailyTotals};

/// Result of [`TripPlanner::generate_logs`].
#[derive(Debug)]
pub struct LogGeneration {
    pub mode: GenerationMode,
    pub entries: Vec<LogEntry>,
    /// Stop arrival and departure times; empty after a simplified run.
    pub schedule: Vec<StopSchedule>,
    pub weekly_duty_hours: f64,
    /// Why detailed generation was abandoned, when it was.
    pub fallback_reason: Option<PlannerError>,
}

pub struct TripPlanner<R, G, S> {
    routing: R,
    geocoder: G,
    store: S,
    estimator: HaversineEstimator,
    rules: HosRules,
    policy: StopPolicy,
}

impl<R, G, S> TripPlanner<R, G, S>
where
    R: RoutingProvider,
    G: ReverseGeocoder,
    S: TripStore,
{
    pub fn new(routing: R, geocoder: G, store: S) -> Self {
        let rules = HosRules::default();
        Self {
            routing,
            geocoder,
            store,
            estimator: HaversineEstimator::new(rules.average_speed_mph),
            rules,
            policy: StopPolicy::default(),
        }
    }

    pub fn with_rules(mut self, rules: HosRules) -> Self {
        self.estimator = HaversineEstimator::new(rules.average_speed_mph);
        self.rules = rules;
        self
    }

    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Route from the current location through pickup to dropoff, then
    /// record the estimates on the trip and store the route.
    pub fn calculate_route(&self, trip_id: TripId) -> Result<RouteData, PlannerError> {
        let mut trip = self.store.trip(trip_id)?;
        for location in [
            &trip.current_location,
            &trip.pickup_location,
            &trip.dropoff_location,
        ] {
            location.coordinates.validate()?;
        }

        let route = self.routing.route(
            trip.current_location.coordinates,
            trip.dropoff_location.coordinates,
            &[trip.pickup_location.coordinates],
        )?;
        if !route.geometry.is_routable() {
            return Err(PlannerError::RoutingProvider(format!(
                "route for trip {trip_id} has no usable geometry"
            )));
        }

        trip.set_estimate(route.distance_miles(), route.duration_hours())?;
        self.store.save_trip(trip)?;
        self.store.save_route(RouteRecord {
            trip_id,
            route: route.clone(),
            created_at: Utc::now().naive_utc(),
        })?;

        info!(
            trip_id = %trip_id,
            miles = route.distance_miles(),
            hours = route.duration_hours(),
            "route calculated"
        );
        Ok(route)
    }

    /// Plan stops afresh and swap them in for the previous generated set.
    pub fn regenerate_stops(&self, trip_id: TripId) -> Result<Vec<Stop>, PlannerError> {
        let trip = self.store.trip(trip_id)?;
        let route = self.store.route(trip_id)?;
        let planned = stops::plan_stops(
            &trip,
            route.as_ref().map(|record| &record.route.geometry),
            &self.geocoder,
            &self.policy,
            &self.rules,
        )?;

        let stops = self.store.replace_generated_stops(trip_id, planned)?;
        info!(trip_id = %trip_id, stops = stops.len(), "stops regenerated");
        Ok(stops)
    }

    /// Detailed log for the trip's current stops. Nothing is persisted.
    pub fn generate_detailed_logs(&self, trip_id: TripId) -> Result<DutyLog, PlannerError> {
        let trip = self.store.trip(trip_id)?;
        let route = self.store.route(trip_id)?;
        let stops = self.store.stops(trip_id)?;
        duty_log::generate_detailed(
            &trip,
            route.as_ref().map(|record| &record.route.geometry),
            &stops,
            &self.estimator,
            &self.rules,
            &self.policy,
        )
    }

    /// Simplified whole-day log for the trip. Nothing is persisted.
    pub fn generate_simplified_logs(&self, trip_id: TripId) -> Result<DutyLog, PlannerError> {
        let trip = self.store.trip(trip_id)?;
        duty_log::generate_simplified(&trip, &self.rules)
    }

    /// Generate and persist the trip's log.
    ///
    /// Uses the simplified generator when the trip has no stops. Otherwise the
    /// detailed generator runs first; if it fails, its error is kept in
    /// [`LogGeneration::fallback_reason`] and the simplified generator runs
    /// instead. Entries are only persisted once a generator has succeeded,
    /// in one store call that also records each stop's arrival and departure.
    ///
    /// Concurrent calls for the same trip must be serialized by the caller.
    pub fn generate_logs(&self, trip_id: TripId) -> Result<LogGeneration, PlannerError> {
        let has_stops = !self.store.stops(trip_id)?.is_empty();

        let (log, fallback_reason) = if has_stops {
            match self.generate_detailed_logs(trip_id) {
                Ok(log) => (log, None),
                Err(err) => {
                    warn!(
                        trip_id = %trip_id,
                        error = %err,
                        "detailed log generation failed, using simplified"
                    );
                    (self.generate_simplified_logs(trip_id)?, Some(err))
                }
            }
        } else {
            (self.generate_simplified_logs(trip_id)?, None)
        };

        self.store
            .save_generated_log(trip_id, log.entries.clone(), &log.schedule)?;

        info!(
            trip_id = %trip_id,
            mode = ?log.mode,
            entries = log.entries.len(),
            "logs generated"
        );
        Ok(LogGeneration {
            mode: log.mode,
            entries: log.entries,
            schedule: log.schedule,
            weekly_duty_hours: log.weekly_duty_hours,
            fallback_reason,
        })
    }

    pub fn validate(&self, trip_id: TripId) -> Result<ComplianceReport, PlannerError> {
        let trip = self.store.trip(trip_id)?;
        let entries = self.store.log_entries(trip_id)?;
        Ok(validator::validate(&trip, &entries, &self.rules))
    }

    pub fn daily_totals(
        &self,
        trip_id: TripId,
        date: NaiveDate,
    ) -> Result<DailyTotals, PlannerError> {
        let entries = self.store.log_entries(trip_id)?;
        Ok(validator::compute_daily_totals(&entries, date))
    }

    pub fn stops(&self, trip_id: TripId) -> Result<Vec<Stop>, PlannerError> {
        self.store.stops(trip_id)
    }

    /// Add a driver-entered stop. It survives stop regeneration and keeps the
    /// order it asked for, though never ahead of the pickup or past the
    /// dropoff.
    pub fn add_manual_stop(&self, trip_id: TripId, stop: Stop) -> Result<Stop, PlannerError> {
        stop.location.coordinates.validate()?;
        stop.validate_duration()?;
        self.store.add_stop(
            trip_id,
            Stop {
                source: StopSource::Manual,
                ..stop
            },
        )
    }

    pub fn log_entries(&self, trip_id: TripId) -> Result<Vec<LogEntry>, PlannerError> {
        self.store.log_entries(trip_id)
    }

    /// Append a hand-written entry, refusing to overfill its date.
    pub fn add_log_entry(&self, trip_id: TripId, entry: LogEntry) -> Result<(), PlannerError> {
        let existing = self.store.log_entries(trip_id)?;
        validator::check_day_capacity(&existing, &entry)?;
        self.store.append_log_entry(trip_id, entry)
    }

    pub fn route(&self, trip_id: TripId) -> Result<Option<RouteRecord>, PlannerError> {
        self.store.route(trip_id)
    }
}

impl<R, G, S> TripPlanner<R, G, S>
where
    R: RoutingProvider + Sync,
    G: ReverseGeocoder + Sync,
    S: TripStore + Sync,
{
    /// Generate logs for many trips in parallel.
    ///
    /// Duplicate ids are generated once. Results come back in ascending id
    /// order.
    pub fn generate_logs_for_trips(
        &self,
        trip_ids: &[TripId],
    ) -> Vec<(TripId, Result<LogGeneration, PlannerError>)> {
        let mut ids = trip_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        ids.into_par_iter()
            .map(|trip_id| (trip_id, self.generate_logs(trip_id)))
            .collect()
    }
}
