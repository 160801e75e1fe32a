//! Trip, stop, and duty-log records exchanged with the persistence boundary.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::polyline::RoutePolyline;

pub const METERS_PER_MILE: f64 = 1609.34;

/// Convert fractional hours into a whole-second span.
pub fn hours_to_delta(hours: f64) -> TimeDelta {
    TimeDelta::seconds((hours * 3600.0).round() as i64)
}

pub fn delta_to_hours(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 / 3600.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a polyline vertex, which is stored as `(lng, lat)`.
    pub fn from_lng_lat((lng, lat): (f64, f64)) -> Self {
        Self { lat, lng }
    }

    pub fn lng_lat(&self) -> (f64, f64) {
        (self.lng, self.lat)
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(PlannerError::InvalidLocation(format!(
                "non-finite coordinates ({}, {})",
                self.lat, self.lng
            )));
        }
        if self.lat.abs() > 90.0 || self.lng.abs() > 180.0 {
            return Err(PlannerError::InvalidLocation(format!(
                "coordinates out of range ({}, {})",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// An addressed point. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub coordinates: Coordinates,
}

impl Location {
    pub fn new(address: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            address: address.into(),
            coordinates: Coordinates::new(lat, lng),
        }
    }

    /// Parse a `{"address": .., "coordinates": {"lat": .., "lng": ..}}` payload.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PlannerError> {
        let location = Location::deserialize(value)
            .map_err(|e| PlannerError::InvalidLocation(e.to_string()))?;
        location.coordinates.validate()?;
        Ok(location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripId(pub u64);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

/// Routing estimate for a trip. Distance and duration always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripEstimate {
    pub distance_miles: f64,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub current_location: Location,
    pub pickup_location: Location,
    pub dropoff_location: Location,
    /// Hours already accumulated in the rolling 70-hour cycle.
    pub current_cycle_hours: f64,
    #[serde(default)]
    estimate: Option<TripEstimate>,
    pub status: TripStatus,
    /// Notional start instant of the trip.
    pub created_at: NaiveDateTime,
}

impl Trip {
    pub fn new(
        id: TripId,
        current_location: Location,
        pickup_location: Location,
        dropoff_location: Location,
        current_cycle_hours: f64,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            current_location,
            pickup_location,
            dropoff_location,
            current_cycle_hours,
            estimate: None,
            status: TripStatus::Planned,
            created_at,
        }
    }

    pub fn with_estimate(
        mut self,
        distance_miles: f64,
        duration_hours: f64,
    ) -> Result<Self, PlannerError> {
        self.set_estimate(distance_miles, duration_hours)?;
        Ok(self)
    }

    pub fn set_estimate(
        &mut self,
        distance_miles: f64,
        duration_hours: f64,
    ) -> Result<(), PlannerError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(distance_miles) || !valid(duration_hours) {
            return Err(PlannerError::Validation(format!(
                "estimates must be non-negative: {distance_miles} mi, {duration_hours} h"
            )));
        }
        self.estimate = Some(TripEstimate {
            distance_miles,
            duration_hours,
        });
        Ok(())
    }

    pub fn estimate(&self) -> Option<TripEstimate> {
        self.estimate
    }

    pub fn estimated_distance(&self) -> Option<f64> {
        self.estimate.map(|e| e.distance_miles)
    }

    pub fn estimated_duration(&self) -> Option<f64> {
        self.estimate.map(|e| e.duration_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    Pickup,
    Dropoff,
    Fueling,
    Rest,
}

impl fmt::Display for StopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopType::Pickup => "pickup",
            StopType::Dropoff => "dropoff",
            StopType::Fueling => "fueling",
            StopType::Rest => "rest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    Generated,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub location: Location,
    pub stop_type: StopType,
    /// Position in the trip, starting at 1. Authoritative for traversal.
    pub order: u32,
    #[serde(default, with = "optional_duration_seconds")]
    pub duration: Option<TimeDelta>,
    pub source: StopSource,
    /// Set from the last detailed log generation.
    #[serde(default)]
    pub arrival_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub departure_time: Option<NaiveDateTime>,
}

impl Stop {
    pub fn generated(location: Location, stop_type: StopType, duration: Option<TimeDelta>) -> Self {
        Self {
            location,
            stop_type,
            order: 0,
            duration,
            source: StopSource::Generated,
            arrival_time: None,
            departure_time: None,
        }
    }

    pub fn manual(
        location: Location,
        stop_type: StopType,
        order: u32,
        duration: Option<TimeDelta>,
    ) -> Self {
        Self {
            location,
            stop_type,
            order,
            duration,
            source: StopSource::Manual,
            arrival_time: None,
            departure_time: None,
        }
    }

    /// Reject a negative duration. An unset duration is fine.
    pub fn validate_duration(&self) -> Result<(), PlannerError> {
        match self.duration {
            Some(duration) if duration < TimeDelta::zero() => {
                Err(PlannerError::Validation(format!(
                    "{} stop {} has negative duration {}s",
                    self.stop_type,
                    self.order,
                    duration.num_seconds()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// When a detailed run reaches and leaves a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopSchedule {
    pub order: u32,
    pub arrival_time: NaiveDateTime,
    pub departure_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    Driving,
    OffDuty,
    Sleeper,
    OnDuty,
}

impl DutyStatus {
    pub const ALL: [DutyStatus; 4] = [
        DutyStatus::Driving,
        DutyStatus::OffDuty,
        DutyStatus::Sleeper,
        DutyStatus::OnDuty,
    ];
}

/// One line of a driver's daily log.
///
/// Entries are only created through [`LogEntry::new`] or [`LogEntry::spanning`];
/// the duration is always derived from the time bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    date: NaiveDate,
    status: DutyStatus,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[serde(with = "duration_seconds")]
    duration: TimeDelta,
    remarks: Option<String>,
}

impl LogEntry {
    /// An `end_time` earlier than `start_time` crosses midnight.
    pub fn new(
        date: NaiveDate,
        status: DutyStatus,
        start_time: NaiveTime,
        end_time: NaiveTime,
        remarks: Option<String>,
    ) -> Result<Self, PlannerError> {
        if start_time == end_time {
            return Err(PlannerError::Validation(format!(
                "log entry on {date} starts and ends at {start_time}"
            )));
        }
        let mut duration = end_time.signed_duration_since(start_time);
        if duration < TimeDelta::zero() {
            duration += TimeDelta::days(1);
        }
        Ok(Self {
            date,
            status,
            start_time,
            end_time,
            duration,
            remarks,
        })
    }

    /// Entry starting at `start` and lasting `length`, dated on its start day.
    pub fn spanning(
        start: NaiveDateTime,
        length: TimeDelta,
        status: DutyStatus,
        remarks: impl Into<String>,
    ) -> Result<Self, PlannerError> {
        if length <= TimeDelta::zero() || length >= TimeDelta::days(1) {
            return Err(PlannerError::Validation(format!(
                "{status:?} entry at {start} must last between zero and 24 hours, got {}s",
                length.num_seconds()
            )));
        }
        let end = start + length;
        Self::new(
            start.date(),
            status,
            start.time(),
            end.time(),
            Some(remarks.into()),
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn status(&self) -> DutyStatus {
        self.status
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at() + self.duration
    }
}

/// Route returned by a routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub geometry: RoutePolyline,
}

impl RouteData {
    pub fn distance_miles(&self) -> f64 {
        self.distance_meters / METERS_PER_MILE
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds / 3600.0
    }
}

/// The stored route for a trip (one per trip, replaced on recalculation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub trip_id: TripId,
    pub route: RouteData,
    pub created_at: NaiveDateTime,
}

mod duration_seconds {
    use chrono::TimeDelta;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }
}

mod optional_duration_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(delta) => serializer.serialize_some(&delta.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            Some(secs) if secs < 0 => Err(serde::de::Error::custom(format!(
                "duration must not be negative, got {secs}s"
            ))),
            Some(secs) => TimeDelta::try_seconds(secs)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("duration out of range")),
            None => Ok(None),
        }
    }
}
