//! Read-only compliance checks over a trip's log entries.

use std::collections::BTreeSet;

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

use crate::config::HosRules;
use crate::error::PlannerError;
use crate::model::{DutyStatus, LogEntry, Trip, hours_to_delta};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

/// Time spent in each duty status on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DailyTotals {
    pub driving: TimeDelta,
    pub off_duty: TimeDelta,
    pub sleeper: TimeDelta,
    pub on_duty: TimeDelta,
}

impl DailyTotals {
    pub fn get(&self, status: DutyStatus) -> TimeDelta {
        match status {
            DutyStatus::Driving => self.driving,
            DutyStatus::OffDuty => self.off_duty,
            DutyStatus::Sleeper => self.sleeper,
            DutyStatus::OnDuty => self.on_duty,
        }
    }

    fn add(&mut self, status: DutyStatus, duration: TimeDelta) {
        let slot = match status {
            DutyStatus::Driving => &mut self.driving,
            DutyStatus::OffDuty => &mut self.off_duty,
            DutyStatus::Sleeper => &mut self.sleeper,
            DutyStatus::OnDuty => &mut self.on_duty,
        };
        *slot += duration;
    }

    pub fn total_day(&self) -> TimeDelta {
        DutyStatus::ALL
            .iter()
            .map(|&status| self.get(status))
            .sum()
    }

    /// Driving plus on-duty time.
    pub fn total_work(&self) -> TimeDelta {
        self.driving + self.on_duty
    }
}

/// Sum entry durations per status for entries dated `date`.
pub fn compute_daily_totals(entries: &[LogEntry], date: NaiveDate) -> DailyTotals {
    let mut totals = DailyTotals::default();
    for entry in entries.iter().filter(|e| e.date() == date) {
        totals.add(entry.status(), entry.duration());
    }
    totals
}

/// Check daily driving and the cycle limit.
pub fn validate(trip: &Trip, entries: &[LogEntry], rules: &HosRules) -> ComplianceReport {
    let mut warnings = Vec::new();

    let max_driving = hours_to_delta(rules.max_driving_hours);
    let dates: BTreeSet<NaiveDate> = entries.iter().map(LogEntry::date).collect();
    for date in dates {
        let driving = compute_daily_totals(entries, date).driving;
        if driving > max_driving {
            warnings.push(format!(
                "On {date}, daily driving duration exceeds {} hours: {}",
                rules.max_driving_hours,
                format_hms(driving)
            ));
        }
    }

    if trip.current_cycle_hours > rules.cycle_limit_hours {
        warnings.push(format!(
            "Total hours in the current cycle exceed {} hours: {}",
            rules.cycle_limit_hours, trip.current_cycle_hours
        ));
    }

    ComplianceReport {
        is_valid: warnings.is_empty(),
        warnings,
    }
}

/// Reject an entry that would push its date past 24 logged hours.
pub fn check_day_capacity(existing: &[LogEntry], candidate: &LogEntry) -> Result<(), PlannerError> {
    let logged = compute_daily_totals(existing, candidate.date()).total_day();
    if logged + candidate.duration() > TimeDelta::days(1) {
        return Err(PlannerError::Validation(format!(
            "total duration for {} cannot exceed 24 hours ({} already logged)",
            candidate.date(),
            format_hms(logged)
        )));
    }
    Ok(())
}

/// `H:MM:SS`, hours unbounded.
fn format_hms(duration: TimeDelta) -> String {
    let secs = duration.num_seconds();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
