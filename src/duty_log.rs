//! Duty-status log generation under Hours-of-Service limits.
//!
//! Two generators share this module:
//!
//! - [`generate_detailed`] walks the trip's stops, inserting required breaks
//!   and resets as the running counters reach their limits.
//! - [`generate_simplified`] needs only the trip's duration estimate and lays
//!   out whole 24-hour days.
//!
//! Both are pure: they return entries and leave persistence to the caller.
//! The running counters live in a [`DutyClock`] value that each step takes
//! and hands back, so a run has no hidden state.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{HosRules, StopPolicy};
use crate::error::PlannerError;
use crate::model::{
    DutyStatus, LogEntry, Stop, StopSchedule, StopType, Trip, delta_to_hours, hours_to_delta,
};
use crate::polyline::RoutePolyline;
use crate::sleeper::{RestKind, SleeperBerthTracker};
use crate::traits::TravelEstimator;

pub const BREAK_REMARK: &str = "Required 30-minute break";
pub const RESET_REMARK: &str = "10-hour off-duty reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Detailed,
    Simplified,
}

/// Output of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct DutyLog {
    pub mode: GenerationMode,
    pub entries: Vec<LogEntry>,
    /// Arrival and departure per stop. Empty for simplified runs, which
    /// never visit stops.
    pub schedule: Vec<StopSchedule>,
    /// Cycle hours after the trip, starting from the trip's current cycle hours.
    pub weekly_duty_hours: f64,
}

/// Running Hours-of-Service counters during a detailed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyClock {
    pub now: NaiveDateTime,
    pub driving_hours_since_reset: f64,
    pub duty_window_start: NaiveDateTime,
    pub driving_hours_since_break: f64,
    pub weekly_duty_hours: f64,
}

impl DutyClock {
    pub fn start(at: NaiveDateTime, cycle_hours: f64) -> Self {
        Self {
            now: at,
            driving_hours_since_reset: 0.0,
            duty_window_start: at,
            driving_hours_since_break: 0.0,
            weekly_duty_hours: cycle_hours,
        }
    }

    /// Hours elapsed since the duty window opened.
    pub fn duty_window_hours(&self) -> f64 {
        delta_to_hours(self.now.signed_duration_since(self.duty_window_start))
    }

    /// Zero the driving counters and open a new window at the current time.
    pub fn reset(self) -> Self {
        Self {
            driving_hours_since_reset: 0.0,
            driving_hours_since_break: 0.0,
            duty_window_start: self.now,
            ..self
        }
    }

    fn advance(self, length: TimeDelta) -> Self {
        Self {
            now: self.now + length,
            ..self
        }
    }

    fn drive(self, hours: f64, length: TimeDelta) -> Self {
        Self {
            driving_hours_since_reset: self.driving_hours_since_reset + hours,
            driving_hours_since_break: self.driving_hours_since_break + hours,
            weekly_duty_hours: self.weekly_duty_hours + hours,
            ..self.advance(length)
        }
    }
}

/// Everything a detailed run carries from one stop to the next.
#[derive(Debug, Clone)]
struct GenerationState {
    clock: DutyClock,
    tracker: SleeperBerthTracker,
}

/// What a detailed run has written so far.
#[derive(Debug, Default)]
struct Output {
    entries: Vec<LogEntry>,
    schedule: Vec<StopSchedule>,
}

struct Walk<'a, E> {
    estimator: &'a E,
    rules: &'a HosRules,
    policy: &'a StopPolicy,
}

/// Build a log by walking the trip's stops in order.
///
/// The clock starts at `trip.created_at`. The first stop's own activity is
/// logged, then every following stop is reached by a driving leg, preceded
/// by a 30-minute break or a reset when the counters call for one. The
/// returned schedule records when each stop was reached and left.
///
/// # Errors
///
/// - [`PlannerError::MissingEstimate`] if the trip has no estimate.
/// - [`PlannerError::RouteDataMissing`] if `route` is absent or unusable.
/// - [`PlannerError::Validation`] if there are no stops, two stops share an
///   order, a stop has a negative duration, or a single activity would last
///   24 hours or more.
pub fn generate_detailed<E: TravelEstimator>(
    trip: &Trip,
    route: Option<&RoutePolyline>,
    stops: &[Stop],
    estimator: &E,
    rules: &HosRules,
    policy: &StopPolicy,
) -> Result<DutyLog, PlannerError> {
    if trip.estimate().is_none() {
        return Err(PlannerError::MissingEstimate("distance/duration"));
    }
    match route {
        Some(route) if route.is_routable() => {}
        _ => {
            return Err(PlannerError::RouteDataMissing(format!(
                "trip {} has no usable route geometry",
                trip.id
            )));
        }
    }

    let mut ordered: Vec<&Stop> = stops.iter().collect();
    ordered.sort_by_key(|stop| stop.order);
    let duplicate = ordered
        .windows(2)
        .find(|pair| pair[0].order == pair[1].order);
    if let Some(pair) = duplicate {
        return Err(PlannerError::Validation(format!(
            "stops share order {} on trip {}",
            pair[0].order, trip.id
        )));
    }
    for stop in &ordered {
        stop.validate_duration()?;
    }
    let Some((first, rest)) = ordered.split_first() else {
        return Err(PlannerError::Validation(format!("trip {} has no stops", trip.id)));
    };

    let walk = Walk {
        estimator,
        rules,
        policy,
    };
    let mut output = Output::default();
    let mut state = GenerationState {
        clock: DutyClock::start(trip.created_at, trip.current_cycle_hours),
        tracker: SleeperBerthTracker::new(rules),
    };

    state = walk.record_stop(state, first, &mut output)?;
    let mut previous = *first;
    for &stop in rest {
        state = walk.drive_to(state, previous, stop, &mut output.entries)?;
        state = walk.record_stop(state, stop, &mut output)?;
        previous = stop;
    }

    if state.clock.weekly_duty_hours > rules.cycle_limit_hours {
        warn!(
            trip_id = %trip.id,
            hours = state.clock.weekly_duty_hours,
            "trip ends beyond the cycle limit"
        );
    }

    Ok(DutyLog {
        mode: GenerationMode::Detailed,
        entries: output.entries,
        schedule: output.schedule,
        weekly_duty_hours: state.clock.weekly_duty_hours,
    })
}

impl<E: TravelEstimator> Walk<'_, E> {
    fn drive_to(
        &self,
        mut state: GenerationState,
        from: &Stop,
        to: &Stop,
        entries: &mut Vec<LogEntry>,
    ) -> Result<GenerationState, PlannerError> {
        let hours = self
            .estimator
            .driving_hours(from.location.coordinates, to.location.coordinates);

        if state.clock.driving_hours_since_break + hours > self.rules.break_after_driving_hours {
            let length = hours_to_delta(self.rules.required_break_hours);
            entries.push(LogEntry::spanning(
                state.clock.now,
                length,
                DutyStatus::OffDuty,
                BREAK_REMARK,
            )?);
            state.clock = DutyClock {
                driving_hours_since_break: 0.0,
                ..state.clock.advance(length)
            };
            debug!(at = %state.clock.now, "inserted required break");
        }

        let driven = state.clock.driving_hours_since_reset;
        let window = state.clock.duty_window_hours();
        if state.tracker.needs_reset(driven, window) {
            if state.tracker.latest_calculation_period().is_some() {
                state.clock = state.clock.reset();
                debug!(at = %state.clock.now, "applied sleeper-berth reset");
            } else {
                let length = hours_to_delta(self.rules.reset_off_duty_hours);
                entries.push(LogEntry::spanning(
                    state.clock.now,
                    length,
                    DutyStatus::OffDuty,
                    RESET_REMARK,
                )?);
                state.clock = state.clock.advance(length).reset();
                debug!(at = %state.clock.now, "inserted off-duty reset");
            }
        }

        let length = hours_to_delta(hours);
        if length > TimeDelta::zero() {
            let remark = format!(
                "Driving to {} stop at {}",
                to.stop_type, to.location.address
            );
            let entry = LogEntry::spanning(state.clock.now, length, DutyStatus::Driving, remark)?;
            entries.push(entry);
            state.clock = state.clock.drive(hours, length);
        }

        Ok(state)
    }

    fn record_stop(
        &self,
        mut state: GenerationState,
        stop: &Stop,
        output: &mut Output,
    ) -> Result<GenerationState, PlannerError> {
        let length = stop
            .duration
            .unwrap_or_else(|| hours_to_delta(self.policy.default_hours(stop.stop_type)));
        let hours = delta_to_hours(length);
        let start = state.clock.now;
        let end = start + length;

        let (status, remark) = match stop.stop_type {
            StopType::Pickup => (DutyStatus::OnDuty, "Pickup"),
            StopType::Dropoff => (DutyStatus::OnDuty, "Dropoff"),
            StopType::Fueling => (DutyStatus::OnDuty, "Fueling"),
            StopType::Rest if hours >= self.rules.sleeper_berth_min_hours => {
                state.tracker.add_qualifying_rest(start, end, RestKind::Sleeper);
                (DutyStatus::Sleeper, "Sleeper berth")
            }
            StopType::Rest if hours >= self.rules.split_rest_min_hours => {
                state.tracker.add_qualifying_rest(start, end, RestKind::OffDuty);
                (DutyStatus::OffDuty, "Rest")
            }
            StopType::Rest => (DutyStatus::OffDuty, "Rest"),
        };

        if length > TimeDelta::zero() {
            let remark = format!("{remark} at {}", stop.location.address);
            output
                .entries
                .push(LogEntry::spanning(start, length, status, remark)?);
        }
        output.schedule.push(StopSchedule {
            order: stop.order,
            arrival_time: start,
            departure_time: end,
        });
        state.clock = state.clock.advance(length);
        if status == DutyStatus::OnDuty {
            state.clock.weekly_duty_hours += hours;
        }

        if stop.stop_type == StopType::Rest && hours >= self.rules.reset_off_duty_hours {
            state.clock = state.clock.reset();
            debug!(at = %state.clock.now, "rest stop reset counters");
        }

        Ok(state)
    }
}

/// Lay out the trip as whole 24-hour days starting at the configured hour.
///
/// Each day drives up to the daily cap; every day but the last then takes
/// the full off-duty reset; the remainder of the day is on duty.
///
/// # Errors
///
/// Returns [`PlannerError::MissingEstimate`] if the trip has no duration.
pub fn generate_simplified(trip: &Trip, rules: &HosRules) -> Result<DutyLog, PlannerError> {
    let total_hours = trip
        .estimated_duration()
        .ok_or(PlannerError::MissingEstimate("duration"))?;
    let hour = rules.day_start_hour;
    let day_start = NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| PlannerError::Validation(format!("invalid day start hour {hour}")))?;

    let days = (total_hours / 24.0).ceil() as i64;
    let first_day = trip.created_at.date().and_time(day_start);
    let mut remaining = total_hours;
    let mut weekly_duty_hours = trip.current_cycle_hours;
    let mut entries = Vec::new();

    for day in 0..days {
        let day_begin = first_day + TimeDelta::days(day);
        let day_end = day_begin + TimeDelta::days(1);
        let last_day = day + 1 == days;
        let mut cursor = day_begin;

        let driving = remaining.min(rules.max_driving_hours);
        remaining -= driving;
        let length = hours_to_delta(driving);
        if length > TimeDelta::zero() {
            entries.push(LogEntry::spanning(cursor, length, DutyStatus::Driving, "Driving")?);
            cursor += length;
            weekly_duty_hours += delta_to_hours(length);
        }

        if !last_day {
            let length = hours_to_delta(rules.reset_off_duty_hours);
            entries.push(LogEntry::spanning(cursor, length, DutyStatus::OffDuty, RESET_REMARK)?);
            cursor += length;
        }

        let on_duty = day_end.signed_duration_since(cursor);
        if on_duty > TimeDelta::zero() {
            entries.push(LogEntry::spanning(
                cursor,
                on_duty,
                DutyStatus::OnDuty,
                "On duty (not driving)",
            )?);
            weekly_duty_hours += delta_to_hours(on_duty);
        }
    }

    debug!(trip_id = %trip.id, days, entries = entries.len(), "generated simplified log");
    Ok(DutyLog {
        mode: GenerationMode::Simplified,
        entries,
        schedule: Vec::new(),
        weekly_duty_hours,
    })
}
