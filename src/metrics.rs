//! Prometheus metrics for the forecast gateway
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `forecast_requests_total` (counter): orchestrated requests labeled by carbon status and outcome
//!   (`primary`, `fallback`, `emergency`).
//! - `forecast_backend_failures_total` (counter): classified backend failures labeled by backend and kind.
//! - `forecast_backend_call_duration_seconds` (histogram): wall time of each backend call.
//! - `forecast_execution_carbon_kg_total` (counter): execution footprint reported by backends.

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Labels for orchestrated requests
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// "LOW" or "HIGH"
    pub carbon_status: String,
    /// "primary", "fallback" or "emergency"
    pub outcome: String,
}

/// Labels for backend failures
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabels {
    pub backend: String,
    /// timeout, unreachable, http_error, protocol_error
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BackendLabels {
    pub backend: String,
}

/// Counter tracking orchestrated requests
pub static REQUESTS_TOTAL: Lazy<Family<RequestLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Counter tracking classified backend failures
pub static BACKEND_FAILURES_TOTAL: Lazy<Family<FailureLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Histogram tracking backend call duration (seconds)
pub static BACKEND_CALL_DURATION_SECONDS: Lazy<Family<BackendLabels, Histogram>> =
    Lazy::new(|| {
        fn call_histogram() -> Histogram {
            // 5ms .. ~40s across 14 buckets.
            Histogram::new(exponential_buckets(0.005, 2.0, 14))
        }
        Family::new_with_constructor(call_histogram)
    });

/// Counter tracking reported execution footprint (kg CO2)
pub static EXECUTION_CARBON_KG_TOTAL: Lazy<Family<BackendLabels, Counter<f64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();
    registry.register(
        "forecast_requests",
        "Total number of orchestrated forecast requests",
        REQUESTS_TOTAL.clone(),
    );
    registry.register(
        "forecast_backend_failures",
        "Total number of classified backend failures",
        BACKEND_FAILURES_TOTAL.clone(),
    );
    registry.register(
        "forecast_backend_call_duration_seconds",
        "Duration of backend prediction calls in seconds",
        BACKEND_CALL_DURATION_SECONDS.clone(),
    );
    registry.register(
        "forecast_execution_carbon_kg",
        "Execution carbon footprint reported by backends in kg CO2",
        EXECUTION_CARBON_KG_TOTAL.clone(),
    );
    registry
});

/// Increment the request counter.
pub fn inc_request(carbon_status: &str, outcome: &str) {
    let labels = RequestLabels {
        carbon_status: carbon_status.to_string(),
        outcome: outcome.to_string(),
    };
    REQUESTS_TOTAL.get_or_create(&labels).inc();
}

/// Increment the backend failure counter.
pub fn inc_backend_failure(backend: &str, kind: &str) {
    let labels = FailureLabels {
        backend: backend.to_string(),
        kind: kind.to_string(),
    };
    BACKEND_FAILURES_TOTAL.get_or_create(&labels).inc();
}

pub fn observe_backend_call_seconds(backend: &str, seconds: f64) {
    let labels = BackendLabels {
        backend: backend.to_string(),
    };
    BACKEND_CALL_DURATION_SECONDS
        .get_or_create(&labels)
        .observe(seconds);
}

pub fn add_execution_carbon_kg(backend: &str, kg: f64) {
    if kg <= 0.0 {
        return;
    }
    let labels = BackendLabels {
        backend: backend.to_string(),
    };
    EXECUTION_CARBON_KG_TOTAL.get_or_create(&labels).inc_by(kg);
}

/// Render the registry in OpenMetrics text format
pub fn encode() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}
