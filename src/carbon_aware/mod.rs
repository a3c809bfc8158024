//! Carbon-aware routing inputs
//!
//! This module provides the simulated grid carbon intensity signal that
//! decides which forecast backend is preferred for a request.

pub mod sensor;
pub mod types;

pub use sensor::CarbonSensor;
pub use types::{
    CarbonReading, CarbonSensorConfig, CarbonStatus, IntensityBand, ParseCarbonStatusError,
    PeakWindow,
};
