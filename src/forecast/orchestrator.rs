//! Carbon-aware routing and fallback
//!
//! Every request walks the same chain:
//!
//! 1. read the carbon sensor and pick primary/secondary backends
//!    (clean grid: high-accuracy first; dirty grid: low-footprint first),
//! 2. call the primary,
//! 3. on a classified failure, call the secondary,
//! 4. on a second classified failure, serve the synthetic emergency series.
//!
//! Calls are strictly sequential and each backend is tried at most once.
//! Only [`BackendError`]s drive the chain; anything else is a bug and is left
//! to propagate.

use crate::carbon_aware::{CarbonReading, CarbonSensor, CarbonStatus};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::forecast::backend::{BackendClient, BackendDescriptor, BackendError, BackendRole};
use crate::forecast::contract::BackendPayload;
use crate::forecast::emergency::EmergencyGenerator;
use crate::forecast::metadata::{ErrorChain, OrchestrationMetadata};
use crate::forecast::types::ForecastResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Cooperative cancellation for a request in progress
///
/// Tripping the handle stops the orchestrator before its next backend call.
/// A call already in flight still runs to completion or to its timeout.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Forecast orchestrator
///
/// Built once at startup and shared by reference (usually behind an `Arc`).
/// Holds no per-request state.
#[derive(Debug)]
pub struct Orchestrator {
    sensor: CarbonSensor,
    client: BackendClient,
    high_accuracy: BackendDescriptor,
    low_footprint: BackendDescriptor,
    emergency: EmergencyGenerator,
}

impl Orchestrator {
    pub fn new(
        sensor: CarbonSensor,
        client: BackendClient,
        high_accuracy: BackendDescriptor,
        low_footprint: BackendDescriptor,
    ) -> Result<Self> {
        if high_accuracy.role != BackendRole::HighAccuracy
            || low_footprint.role != BackendRole::LowFootprint
        {
            return Err(Error::ConfigError(
                "backend descriptors passed in the wrong routing slots".to_string(),
            ));
        }
        if high_accuracy.name == low_footprint.name {
            return Err(Error::ConfigError(format!(
                "both backends are named '{}'",
                high_accuracy.name
            )));
        }
        Ok(Self {
            sensor,
            client,
            high_accuracy,
            low_footprint,
            emergency: EmergencyGenerator::new(),
        })
    }

    /// Validate `config` and build an orchestrator with a fresh HTTP client
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            CarbonSensor::new(config.sensor.clone())?,
            BackendClient::new()?,
            config.high_accuracy_descriptor(),
            config.low_footprint_descriptor(),
        )
    }

    pub fn high_accuracy(&self) -> &BackendDescriptor {
        &self.high_accuracy
    }

    pub fn low_footprint(&self) -> &BackendDescriptor {
        &self.low_footprint
    }

    /// `(primary, secondary)` for a grid status
    pub fn route(&self, status: CarbonStatus) -> (&BackendDescriptor, &BackendDescriptor) {
        match status {
            CarbonStatus::Low => (&self.high_accuracy, &self.low_footprint),
            CarbonStatus::High => (&self.low_footprint, &self.high_accuracy),
        }
    }

    /// Current sensor reading; never calls a backend
    pub fn get_live_grid_status(&self, carbon_mode_override: Option<CarbonStatus>) -> CarbonReading {
        self.sensor.get_reading(carbon_mode_override)
    }

    /// Route one forecast request through the fallback chain
    ///
    /// Expected failures never surface as `Err`: the result is either served by
    /// a backend (`status = ok`) or degraded to the emergency series.
    pub async fn get_optimized_forecast(
        &self,
        country_code: &str,
        carbon_mode_override: Option<CarbonStatus>,
    ) -> Result<(ForecastResult, OrchestrationMetadata)> {
        self.get_optimized_forecast_with_cancel(
            country_code,
            carbon_mode_override,
            &CancelHandle::new(),
        )
        .await
    }

    /// As [`Self::get_optimized_forecast`], stopping with [`Error::Cancelled`]
    /// if `cancel` is tripped before a backend call starts
    #[instrument(skip(self, cancel), fields(country = %country_code))]
    pub async fn get_optimized_forecast_with_cancel(
        &self,
        country_code: &str,
        carbon_mode_override: Option<CarbonStatus>,
        cancel: &CancelHandle,
    ) -> Result<(ForecastResult, OrchestrationMetadata)> {
        let reading = self.sensor.get_reading(carbon_mode_override);
        let (primary, secondary) = self.route(reading.status);

        info!(
            "Grid {} ({:.1} {}{}), routing {} to {} with {} as fallback",
            reading.status,
            reading.intensity_value,
            CarbonReading::UNIT,
            if reading.manual_override { ", forced" } else { "" },
            country_code,
            primary.name,
            secondary.name
        );

        let mut error_chain = ErrorChain::new();

        for (stage, backend) in [("primary", primary), ("fallback", secondary)] {
            if cancel.is_cancelled() {
                info!("Request for {} cancelled before calling {}", country_code, backend.name);
                return Err(Error::Cancelled);
            }

            match self.attempt(backend, country_code).await {
                Ok(payload) => {
                    info!(
                        "{} answered for {} with {} rows ({})",
                        backend.name,
                        country_code,
                        payload.forecast.len(),
                        stage
                    );
                    #[cfg(feature = "metrics")]
                    {
                        crate::metrics::inc_request(reading.status.as_str(), stage);
                        crate::metrics::add_execution_carbon_kg(
                            &backend.name,
                            payload.execution_carbon_kg,
                        );
                    }
                    let metadata = OrchestrationMetadata::served(
                        reading,
                        error_chain,
                        &backend.name,
                        payload.execution_carbon_kg,
                    );
                    return Ok((payload.forecast, metadata));
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", backend.name, country_code, e);
                    #[cfg(feature = "metrics")]
                    crate::metrics::inc_backend_failure(&backend.name, e.kind().as_str());
                    error_chain.push(&backend.name, &e);
                }
            }
        }

        warn!(
            "All backends failed for {} ({}), serving emergency forecast",
            country_code,
            error_chain.summary()
        );
        #[cfg(feature = "metrics")]
        crate::metrics::inc_request(reading.status.as_str(), "emergency");

        Ok(self.emergency.generate(country_code, &error_chain, reading))
    }

    async fn attempt(
        &self,
        backend: &BackendDescriptor,
        country_code: &str,
    ) -> std::result::Result<BackendPayload, BackendError> {
        debug!(
            "Calling {} at {} (timeout {:?})",
            backend.name, backend.base_url, backend.timeout
        );
        let started = Instant::now();
        let result = self
            .client
            .call(backend, country_code, backend.timeout)
            .await;

        #[cfg(feature = "metrics")]
        crate::metrics::observe_backend_call_seconds(
            &backend.name,
            started.elapsed().as_secs_f64(),
        );
        debug!("{} returned after {:?}", backend.name, started.elapsed());

        result
    }
}
