//! Carbon Forecast: carbon-aware routing for renewable generation forecasts
//!
//! This crate routes forecast requests between a high-accuracy and a
//! low-footprint prediction backend depending on a simulated grid carbon
//! intensity signal, with fallback to the other backend and a synthetic
//! emergency series when both are unavailable.

pub mod carbon_aware;
pub mod config;
pub mod error;
pub mod forecast;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "rest-api")]
pub mod rest_api;

pub use crate::error::{Error, Result};
pub use crate::forecast::Orchestrator;
