//! Request and response bodies for the REST API

use serde::{Deserialize, Serialize};

use crate::forecast::{ForecastRow, OrchestrationMetadata};

/// Banner returned by `/`
#[derive(Serialize, Debug)]
pub struct StatusBanner {
    pub status: String,
}

/// Health check response
#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Optional carbon mode override, e.g. `?carbon_mode=HIGH`
#[derive(Deserialize, Debug, Default)]
pub struct CarbonModeQuery {
    pub carbon_mode: Option<String>,
}

/// Forecast envelope consumed by the dashboard
#[derive(Serialize, Debug)]
pub struct ForecastResponse {
    pub metadata: OrchestrationMetadata,
    pub forecast: Vec<ForecastRow>,
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}
