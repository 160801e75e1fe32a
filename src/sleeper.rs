//! Sleeper-berth split-rest tracking.
//!
//! A required 10-hour break may be split into two periods as long as one of
//! them is at least 7 hours in the sleeper berth and together they cover 10
//! hours. The tracker records qualifying rests for a single generation run
//! and derives every pairing that satisfies the provision.

use chrono::NaiveDateTime;

use crate::config::HosRules;
use crate::model::delta_to_hours;

/// How the driver spent a rest period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestKind {
    Sleeper,
    OffDuty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifyingKind {
    /// Sleeper-berth period of at least 7 hours.
    Sleeper7Plus,
    /// Any rest of at least 2 hours.
    Rest2Plus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualifyingRestPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub kind: QualifyingKind,
}

/// Two rest periods that together satisfy the split-rest provision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationPeriod {
    pub first: QualifyingRestPeriod,
    pub second: QualifyingRestPeriod,
}

impl CalculationPeriod {
    pub fn combined_hours(&self) -> f64 {
        self.first.duration_hours + self.second.duration_hours
    }
}

#[derive(Debug, Clone)]
pub struct SleeperBerthTracker {
    sleeper_min_hours: f64,
    rest_min_hours: f64,
    reset_hours: f64,
    max_driving_hours: f64,
    duty_window_hours: f64,
    /// Ordered by start time.
    periods: Vec<QualifyingRestPeriod>,
    calculation_periods: Vec<CalculationPeriod>,
}

impl Default for SleeperBerthTracker {
    fn default() -> Self {
        Self::new(&HosRules::default())
    }
}

impl SleeperBerthTracker {
    pub fn new(rules: &HosRules) -> Self {
        Self {
            sleeper_min_hours: rules.sleeper_berth_min_hours,
            rest_min_hours: rules.split_rest_min_hours,
            reset_hours: rules.reset_off_duty_hours,
            max_driving_hours: rules.max_driving_hours,
            duty_window_hours: rules.duty_window_hours,
            periods: Vec::new(),
            calculation_periods: Vec::new(),
        }
    }

    /// Record a rest if it qualifies. Returns the classification it got, or
    /// `None` when the rest is too short to count.
    pub fn add_qualifying_rest(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kind: RestKind,
    ) -> Option<QualifyingKind> {
        let duration_hours = delta_to_hours(end.signed_duration_since(start));
        let qualifying = if kind == RestKind::Sleeper && duration_hours >= self.sleeper_min_hours {
            QualifyingKind::Sleeper7Plus
        } else if duration_hours >= self.rest_min_hours {
            QualifyingKind::Rest2Plus
        } else {
            return None;
        };

        let period = QualifyingRestPeriod {
            start,
            end,
            duration_hours,
            kind: qualifying,
        };
        let at = self.periods.partition_point(|p| p.start <= start);
        self.periods.insert(at, period);
        self.recompute();

        Some(qualifying)
    }

    pub fn periods(&self) -> &[QualifyingRestPeriod] {
        &self.periods
    }

    pub fn calculation_periods(&self) -> &[CalculationPeriod] {
        &self.calculation_periods
    }

    /// Most recently derived pairing.
    pub fn latest_calculation_period(&self) -> Option<&CalculationPeriod> {
        self.calculation_periods.last()
    }

    /// Whether the driving or duty-window limit has been reached.
    ///
    /// Calculation periods do not extend either limit.
    pub fn needs_reset(&self, current_driving_hours: f64, duty_window_hours: f64) -> bool {
        current_driving_hours >= self.max_driving_hours
            || duty_window_hours >= self.duty_window_hours
    }

    fn recompute(&mut self) {
        self.calculation_periods.clear();
        for (i, first) in self.periods.iter().enumerate() {
            for second in &self.periods[i + 1..] {
                let has_sleeper = first.kind == QualifyingKind::Sleeper7Plus
                    || second.kind == QualifyingKind::Sleeper7Plus;
                if has_sleeper && first.duration_hours + second.duration_hours >= self.reset_hours {
                    self.calculation_periods.push(CalculationPeriod {
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
    }
}
