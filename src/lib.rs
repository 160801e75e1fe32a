//! hos-planner: truck trip planning under FMCSA Hours-of-Service rules.
//!
//! Derives mandatory stops along a route, generates duty-status logs that
//! respect the driving, window, break, reset, sleeper-berth, and cycle
//! limits, and validates existing logs against them.

pub mod config;
pub mod duty_log;
pub mod error;
pub mod geo;
pub mod haversine;
pub mod mapbox;
pub mod model;
pub mod osrm;
pub mod osrm_data;
pub mod polyline;
pub mod service;
pub mod sleeper;
pub mod stops;
pub mod store;
pub mod traits;
pub mod validator;
