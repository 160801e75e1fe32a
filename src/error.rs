//! Error kinds surfaced by the compliance engine and its boundaries.

use thiserror::Error;

use crate::model::TripId;

/// Errors returned by planning, generation, and the collaborator boundaries.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Route geometry is needed for interpolation but none is available.
    #[error("route data missing: {0}")]
    RouteDataMissing(String),

    /// Distance or duration estimate is absent where one is required.
    #[error("trip has no {0} estimate")]
    MissingEstimate(&'static str),

    /// Location payload lacks the address/coordinate shape.
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Upstream routing call failed or returned no route.
    #[error("routing provider error: {0}")]
    RoutingProvider(String),

    /// A log entry or schedule broke a time-ordering or duration invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// No trip with this id exists in the store.
    #[error("trip {0} not found")]
    TripNotFound(TripId),

    /// The persistence boundary could not complete the operation.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        PlannerError::RoutingProvider(err.to_string())
    }
}
