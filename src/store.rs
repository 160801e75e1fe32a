//! In-memory implementation of the persistence boundary.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::PlannerError;
use crate::model::{LogEntry, RouteRecord, Stop, StopSchedule, StopSource, Trip, TripId};
use crate::traits::TripStore;

/// A stop plus, for manual stops, the position the caller asked for. The
/// stop's own `order` is renumbered freely; the request survives.
#[derive(Debug, Clone)]
struct StoredStop {
    stop: Stop,
    requested_order: Option<u32>,
}

impl StoredStop {
    fn new(stop: Stop) -> Self {
        let requested_order = match stop.source {
            StopSource::Manual => Some(stop.order.max(1)),
            StopSource::Generated => None,
        };
        Self {
            stop,
            requested_order,
        }
    }

    fn requested_position(&self) -> usize {
        self.requested_order.unwrap_or(u32::MAX) as usize
    }
}

#[derive(Debug, Clone)]
struct TripRecord {
    trip: Trip,
    route: Option<RouteRecord>,
    stops: Vec<StoredStop>,
    logs: Vec<LogEntry>,
}

impl TripRecord {
    fn stops(&self) -> Vec<Stop> {
        self.stops
            .iter()
            .map(|stored| stored.stop.clone())
            .collect()
    }
}

/// Thread-safe store holding every trip behind one lock.
///
/// Each trait call takes the lock once, so multi-step updates such as stop
/// replacement are observed either fully applied or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    trips: Mutex<HashMap<TripId, TripRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TripId, TripRecord>>, PlannerError> {
        self.trips
            .lock()
            .map_err(|_| PlannerError::Storage("trip store lock poisoned".to_string()))
    }

    fn with_record<T>(
        &self,
        id: TripId,
        f: impl FnOnce(&mut TripRecord) -> Result<T, PlannerError>,
    ) -> Result<T, PlannerError> {
        let mut trips = self.lock()?;
        let record = trips.get_mut(&id).ok_or(PlannerError::TripNotFound(id))?;
        f(record)
    }
}

/// Reassign orders `1..=n` following the current order.
fn renumber(stops: &mut [StoredStop]) {
    for (stored, order) in stops.iter_mut().zip(1..) {
        stored.stop.order = order;
    }
}

impl TripStore for MemoryStore {
    fn trip(&self, id: TripId) -> Result<Trip, PlannerError> {
        self.with_record(id, |record| Ok(record.trip.clone()))
    }

    fn save_trip(&self, trip: Trip) -> Result<(), PlannerError> {
        let mut trips = self.lock()?;
        match trips.get_mut(&trip.id) {
            Some(record) => record.trip = trip,
            None => {
                trips.insert(
                    trip.id,
                    TripRecord {
                        trip,
                        route: None,
                        stops: Vec::new(),
                        logs: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    fn route(&self, id: TripId) -> Result<Option<RouteRecord>, PlannerError> {
        self.with_record(id, |record| Ok(record.route.clone()))
    }

    fn save_route(&self, route: RouteRecord) -> Result<(), PlannerError> {
        self.with_record(route.trip_id, |record| {
            record.route = Some(route);
            Ok(())
        })
    }

    fn stops(&self, id: TripId) -> Result<Vec<Stop>, PlannerError> {
        self.with_record(id, |record| Ok(record.stops()))
    }

    /// A manual stop that asked for order `k` lands at position `k` of the
    /// merged set, but always after the first generated stop and before the
    /// last one, so pickup and dropoff keep the ends. Arrival and departure
    /// times are cleared since the sequence changed.
    fn replace_generated_stops(
        &self,
        id: TripId,
        stops: Vec<Stop>,
    ) -> Result<Vec<Stop>, PlannerError> {
        self.with_record(id, |record| {
            let mut manual: Vec<StoredStop> = record
                .stops
                .iter()
                .filter(|stored| stored.stop.source == StopSource::Manual)
                .cloned()
                .collect();
            manual.sort_by_key(StoredStop::requested_position);

            let mut generated = stops;
            generated.sort_by_key(|stop| stop.order);
            let last = generated.len().saturating_sub(1);

            let mut merged = Vec::with_capacity(manual.len() + generated.len());
            let mut manual = manual.into_iter().peekable();
            for (index, stop) in generated.into_iter().enumerate() {
                if index == last {
                    merged.extend(manual.by_ref());
                } else if index > 0 {
                    while let Some(next) =
                        manual.next_if(|m| m.requested_position() <= merged.len() + 1)
                    {
                        merged.push(next);
                    }
                }
                merged.push(StoredStop::new(Stop {
                    source: StopSource::Generated,
                    ..stop
                }));
            }
            merged.extend(manual);

            for stored in &mut merged {
                stored.stop.arrival_time = None;
                stored.stop.departure_time = None;
            }
            renumber(&mut merged);

            record.stops = merged;
            Ok(record.stops())
        })
    }

    /// Inserts at the stop's `order` (clamped to the end) and renumbers.
    fn add_stop(&self, id: TripId, stop: Stop) -> Result<Stop, PlannerError> {
        self.with_record(id, |record| {
            let position = (stop.order.max(1) as usize - 1).min(record.stops.len());
            record.stops.insert(position, StoredStop::new(stop));
            renumber(&mut record.stops);
            Ok(record.stops[position].stop.clone())
        })
    }

    fn log_entries(&self, id: TripId) -> Result<Vec<LogEntry>, PlannerError> {
        self.with_record(id, |record| Ok(record.logs.clone()))
    }

    fn append_log_entry(&self, id: TripId, entry: LogEntry) -> Result<(), PlannerError> {
        self.with_record(id, |record| {
            record.logs.push(entry);
            Ok(())
        })
    }

    fn save_generated_log(
        &self,
        id: TripId,
        entries: Vec<LogEntry>,
        schedule: &[StopSchedule],
    ) -> Result<(), PlannerError> {
        self.with_record(id, |record| {
            for timing in schedule {
                let stored = record
                    .stops
                    .iter_mut()
                    .find(|stored| stored.stop.order == timing.order);
                if let Some(stored) = stored {
                    stored.stop.arrival_time = Some(timing.arrival_time);
                    stored.stop.departure_time = Some(timing.departure_time);
                }
            }
            record.logs.extend(entries);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;
    use crate::model::{DutyStatus, Location, StopType};

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn trip(id: u64) -> Trip {
        let here = Location::new("Depot", 35.0, -100.0);
        Trip::new(TripId(id), here.clone(), here.clone(), here, 0.0, created())
    }

    fn generated(order: u32, stop_type: StopType) -> Stop {
        let location = Location::new(format!("g{order}"), 35.0, -100.0);
        Stop {
            order,
            ..Stop::generated(location, stop_type, None)
        }
    }

    fn manual(address: &str, order: u32) -> Stop {
        let location = Location::new(address, 35.1, -99.0);
        Stop::manual(location, StopType::Rest, order, Some(TimeDelta::hours(3)))
    }

    fn short_plan() -> Vec<Stop> {
        vec![
            generated(1, StopType::Pickup),
            generated(2, StopType::Dropoff),
        ]
    }

    fn full_plan() -> Vec<Stop> {
        vec![
            generated(1, StopType::Pickup),
            generated(2, StopType::Fueling),
            generated(3, StopType::Rest),
            generated(4, StopType::Dropoff),
        ]
    }

    fn regenerate(store: &MemoryStore, plan: Vec<Stop>) -> Vec<Stop> {
        store.replace_generated_stops(TripId(1), plan).unwrap()
    }

    fn addresses(stops: &[Stop]) -> Vec<&str> {
        stops.iter().map(|s| s.location.address.as_str()).collect()
    }

    fn orders(stops: &[Stop]) -> Vec<u32> {
        stops.iter().map(|s| s.order).collect()
    }

    #[test]
    fn test_missing_trip() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.trip(TripId(1)),
            Err(PlannerError::TripNotFound(TripId(1)))
        ));
        assert!(matches!(
            store.stops(TripId(1)),
            Err(PlannerError::TripNotFound(_))
        ));
    }

    #[test]
    fn test_replace_drops_previous_generated() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        regenerate(&store, full_plan());

        let stops = regenerate(&store, short_plan());
        assert_eq!(stops.len(), 2);
        assert_eq!(store.stops(TripId(1)).unwrap(), stops);
    }

    #[test]
    fn test_replace_keeps_manual_position() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        let added = store
            .add_stop(TripId(1), manual("weigh station", 2))
            .unwrap();
        assert_eq!(added.order, 1);

        let stops = regenerate(&store, full_plan());

        assert_eq!(
            addresses(&stops),
            vec!["g1", "weigh station", "g2", "g3", "g4"]
        );
        assert_eq!(orders(&stops), vec![1, 2, 3, 4, 5]);
        assert_eq!(stops[1].source, StopSource::Manual);
    }

    #[test]
    fn test_manual_stop_never_precedes_pickup() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        store.add_stop(TripId(1), manual("early", 1)).unwrap();

        let stops = regenerate(&store, full_plan());
        assert_eq!(addresses(&stops), vec!["g1", "early", "g2", "g3", "g4"]);
        assert_eq!(stops[0].stop_type, StopType::Pickup);
    }

    #[test]
    fn test_add_stop_beyond_end_is_appended() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        regenerate(&store, short_plan());

        let added = store.add_stop(TripId(1), manual("late", 40)).unwrap();
        assert_eq!(added.order, 3);
        assert_eq!(
            addresses(&store.stops(TripId(1)).unwrap()),
            vec!["g1", "g2", "late"]
        );
    }

    #[test]
    fn test_replace_keeps_dropoff_last() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        store.add_stop(TripId(1), manual("late", 40)).unwrap();

        let stops = regenerate(&store, short_plan());
        assert_eq!(addresses(&stops), vec!["g1", "late", "g2"]);
        assert_eq!(orders(&stops), vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_is_stable_across_rounds() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        store.add_stop(TripId(1), manual("scale", 3)).unwrap();

        let first = regenerate(&store, full_plan());
        let second = regenerate(&store, full_plan());
        assert_eq!(first, second);
        assert_eq!(addresses(&second), vec!["g1", "g2", "scale", "g3", "g4"]);
    }

    #[test]
    fn test_save_trip_keeps_children() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        store
            .add_stop(TripId(1), generated(1, StopType::Pickup))
            .unwrap();
        let mut updated = trip(1);
        updated.current_cycle_hours = 12.0;
        store.save_trip(updated).unwrap();
        assert_eq!(store.trip(TripId(1)).unwrap().current_cycle_hours, 12.0);
        assert_eq!(store.stops(TripId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_generated_log_saved_with_stop_times() {
        let store = MemoryStore::new();
        store.save_trip(trip(1)).unwrap();
        regenerate(&store, short_plan());

        let start = created();
        let entry = LogEntry::spanning(start, TimeDelta::hours(1), DutyStatus::OnDuty, "Pickup")
            .unwrap();
        let schedule = [StopSchedule {
            order: 1,
            arrival_time: start,
            departure_time: start + TimeDelta::hours(1),
        }];
        store
            .save_generated_log(TripId(1), vec![entry.clone()], &schedule)
            .unwrap();

        assert_eq!(store.log_entries(TripId(1)).unwrap(), vec![entry]);
        let stops = store.stops(TripId(1)).unwrap();
        assert_eq!(stops[0].arrival_time, Some(start));
        assert_eq!(stops[0].departure_time, Some(start + TimeDelta::hours(1)));
        assert_eq!(stops[1].arrival_time, None);
    }

    #[test]
    fn test_generated_log_for_missing_trip_writes_nothing() {
        let store = MemoryStore::new();
        let err = store
            .save_generated_log(TripId(5), Vec::new(), &[])
            .unwrap_err();
        assert!(matches!(err, PlannerError::TripNotFound(TripId(5))));
    }
}
