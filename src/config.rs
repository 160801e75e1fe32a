//! Regulatory limits, stop-planning policy, and provider configuration.

use thiserror::Error;

use crate::model::StopType;

/// Hours-of-Service limits applied by the generator and validator.
///
/// Defaults follow the FMCSA property-carrying rules (49 CFR §395.3) for the
/// subset the engine enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct HosRules {
    /// Maximum driving hours before a reset is required.
    pub max_driving_hours: f64,
    /// Length of the on-duty window opened by the first on-duty activity.
    pub duty_window_hours: f64,
    /// Cumulative driving after which a break is required.
    pub break_after_driving_hours: f64,
    pub required_break_hours: f64,
    /// Consecutive off-duty hours that restart the driving/window counters.
    pub reset_off_duty_hours: f64,
    /// Minimum sleeper-berth period for the split-rest provision.
    pub sleeper_berth_min_hours: f64,
    /// Minimum companion rest period for the split-rest provision.
    pub split_rest_min_hours: f64,
    /// Rolling 8-day on-duty cycle limit.
    pub cycle_limit_hours: f64,
    /// Average speed assumed between stops.
    pub average_speed_mph: f64,
    /// Hour of day at which simplified logs start.
    pub day_start_hour: u32,
}

impl Default for HosRules {
    fn default() -> Self {
        Self {
            max_driving_hours: 11.0,
            duty_window_hours: 14.0,
            break_after_driving_hours: 8.0,
            required_break_hours: 0.5,
            reset_off_duty_hours: 10.0,
            sleeper_berth_min_hours: 7.0,
            split_rest_min_hours: 2.0,
            cycle_limit_hours: 70.0,
            average_speed_mph: 60.0,
            day_start_hour: 8,
        }
    }
}

/// How intermediate stops are ordered once generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteOrdering {
    /// Fueling and rest stops are merged by their position along the route.
    #[default]
    RoutePosition,
    /// All fueling stops first, then all rest stops, in emission order.
    EmissionBlocks,
}

/// Controls where stops are placed and how long each kind lasts.
#[derive(Debug, Clone, PartialEq)]
pub struct StopPolicy {
    pub fuel_interval_miles: f64,
    pub rest_interval_hours: f64,
    pub pickup_hours: f64,
    pub dropoff_hours: f64,
    pub fueling_hours: f64,
    /// Applied to rest stops created without an explicit duration.
    pub default_rest_hours: f64,
    pub ordering: RouteOrdering,
    /// Reject stop sets whose gaps imply more driving than the daily cap.
    pub strict_feasibility: bool,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            fuel_interval_miles: 1000.0,
            rest_interval_hours: 8.0,
            pickup_hours: 1.0,
            dropoff_hours: 1.0,
            fueling_hours: 0.5,
            default_rest_hours: 0.5,
            ordering: RouteOrdering::default(),
            strict_feasibility: false,
        }
    }
}

impl StopPolicy {
    /// Duration used for a stop whose own duration is unset.
    pub fn default_hours(&self, stop_type: StopType) -> f64 {
        match stop_type {
            StopType::Pickup => self.pickup_hours,
            StopType::Dropoff => self.dropoff_hours,
            StopType::Fueling => self.fueling_hours,
            StopType::Rest => self.default_rest_hours,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

const DEFAULT_MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Clone)]
pub struct MapboxConfig {
    pub access_token: String,
    pub base_url: String,
    /// Directions profile, e.g. `driving` or `driving-traffic`.
    pub profile: String,
    pub timeout_secs: u64,
}

impl MapboxConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_MAPBOX_BASE_URL.to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }

    /// Load from `MAPBOX_API_KEY`, `MAPBOX_BASE_URL`, and `MAPBOX_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is missing or the timeout is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build from an arbitrary variable lookup so callers and tests need not
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let access_token = lookup("MAPBOX_API_KEY")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("MAPBOX_API_KEY".to_string()))?;

        let mut config = Self::new(access_token);
        if let Ok(base_url) = lookup("MAPBOX_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(raw) = lookup("MAPBOX_TIMEOUT_SECS") {
            config.timeout_secs = match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidEnvVar {
                        var: "MAPBOX_TIMEOUT_SECS".to_string(),
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::InvalidEnvVar {
                        var: "MAPBOX_TIMEOUT_SECS".to_string(),
                        reason: e.to_string(),
                    });
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_default_rules_match_fmcsa_limits() {
        let rules = HosRules::default();
        assert_eq!(rules.max_driving_hours, 11.0);
        assert_eq!(rules.duty_window_hours, 14.0);
        assert_eq!(rules.cycle_limit_hours, 70.0);
        assert_eq!(rules.day_start_hour, 8);
    }

    #[test]
    fn test_default_hours_by_stop_type() {
        let policy = StopPolicy::default();
        assert_eq!(policy.default_hours(StopType::Pickup), 1.0);
        assert_eq!(policy.default_hours(StopType::Fueling), 0.5);
        assert_eq!(policy.default_hours(StopType::Rest), 0.5);
    }

    #[test]
    fn test_mapbox_config_requires_token() {
        let err = MapboxConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar(ref var) if var == "MAPBOX_API_KEY"
        ));
    }

    #[test]
    fn test_mapbox_config_blank_token_is_missing() {
        let lookup = lookup_from(&[("MAPBOX_API_KEY", "  ")]);
        let err = MapboxConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_mapbox_config_overrides() {
        let config = MapboxConfig::from_lookup(lookup_from(&[
            ("MAPBOX_API_KEY", "pk.test"),
            ("MAPBOX_BASE_URL", "http://localhost:9000/"),
            ("MAPBOX_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.access_token, "pk.test");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn test_mapbox_config_rejects_bad_timeout() {
        let err = MapboxConfig::from_lookup(lookup_from(&[
            ("MAPBOX_API_KEY", "pk.test"),
            ("MAPBOX_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar { ref var, .. } if var == "MAPBOX_TIMEOUT_SECS"
        ));
    }
}
