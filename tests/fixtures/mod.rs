//! Test fixtures for hos-planner.
//!
//! Provides realistic test data including:
//! - Real city coordinates along US interstate freight corridors
//! - Coarse route polylines through those cities

#![allow(dead_code)]

pub mod freight_corridors;

pub use freight_corridors::*;
