//! Simulated carbon intensity sensor
//!
//! There is no live carbon data feed behind this sensor. The grid status is
//! derived from the wall-clock hour against the configured demand peaks, or
//! forced by the caller, and the intensity is drawn from the matching band.

use crate::carbon_aware::types::{CarbonReading, CarbonSensorConfig, CarbonStatus};
use crate::error::{Error, Result};
use chrono::{Local, Timelike, Utc};
use rand::Rng;

/// Virtual carbon intensity sensor
///
/// Holds only immutable configuration. Randomness comes from the thread-local
/// generator, so one sensor can be shared freely across concurrent requests.
#[derive(Clone, Debug, Default)]
pub struct CarbonSensor {
    config: CarbonSensorConfig,
}

impl CarbonSensor {
    /// Build a sensor; an empty, inverted or non-finite band is rejected here
    /// so that sampling can never fail later
    pub fn new(config: CarbonSensorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("sensor: {e}")))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CarbonSensorConfig {
        &self.config
    }

    /// Take a reading, honouring an optional caller override
    pub fn get_reading(&self, force_mode: Option<CarbonStatus>) -> CarbonReading {
        let hour = Local::now().hour();
        self.reading_at_hour(force_mode, hour, &mut rand::thread_rng())
    }

    /// Whether `hour` falls inside one of the configured demand peaks
    pub fn is_peak_hour(&self, hour: u32) -> bool {
        self.config.peak_windows.iter().any(|w| w.contains(hour))
    }

    pub(crate) fn reading_at_hour<R: Rng + ?Sized>(
        &self,
        force_mode: Option<CarbonStatus>,
        hour: u32,
        rng: &mut R,
    ) -> CarbonReading {
        let (status, manual_override) = match force_mode {
            Some(status) => (status, true),
            None if self.is_peak_hour(hour) => (CarbonStatus::High, false),
            None => (CarbonStatus::Low, false),
        };

        let band = match status {
            CarbonStatus::Low => self.config.low_band,
            CarbonStatus::High => self.config.high_band,
        };

        // Floor to one decimal so the value stays inside the half-open band
        let raw = rng.gen_range(band.range());
        let intensity_value = ((raw * 10.0).floor() / 10.0).max(band.min);

        CarbonReading {
            timestamp: Utc::now(),
            intensity_value,
            status,
            manual_override,
        }
    }
}
