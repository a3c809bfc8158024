//! Synthetic degraded forecast
//!
//! Served only when every backend failed. The curves are fixed shapes, not a
//! model: they keep the response structurally valid so callers can render
//! something while the metadata tells them it is not real output.

use crate::carbon_aware::CarbonReading;
use crate::forecast::metadata::{ErrorChain, OrchestrationMetadata, EMERGENCY_BACKEND};
use crate::forecast::types::{ForecastResult, ForecastRow};
use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use std::f64::consts::PI;

/// Number of hourly rows in the synthetic series
pub const EMERGENCY_HORIZON_HOURS: usize = 24;

pub const SOLAR_CHANNEL: &str = "Solar";
pub const WIND_ONSHORE_CHANNEL: &str = "Wind_Onshore";
pub const WIND_OFFSHORE_CHANNEL: &str = "Wind_Offshore";

/// Solar output is zero outside `(DAYLIGHT_START_HOUR, DAYLIGHT_END_HOUR)`
pub const DAYLIGHT_START_HOUR: u32 = 6;
pub const DAYLIGHT_END_HOUR: u32 = 18;
pub const SOLAR_PEAK_MW: f64 = 5000.0;

const ONSHORE_BASELINE_MW: f64 = 3000.0;
const ONSHORE_AMPLITUDE_MW: f64 = 1500.0;
const OFFSHORE_BASELINE_MW: f64 = 1200.0;
const OFFSHORE_AMPLITUDE_MW: f64 = 600.0;
const OFFSHORE_PHASE: f64 = PI / 2.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct EmergencyGenerator;

impl EmergencyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build the degraded answer for `country_code`, starting at the current hour
    pub fn generate(
        &self,
        country_code: &str,
        triggering_errors: &ErrorChain,
        carbon_context: CarbonReading,
    ) -> (ForecastResult, OrchestrationMetadata) {
        let forecast = self.series_from(current_hour());
        let reason = if triggering_errors.is_empty() {
            format!("no backend answered for {country_code}")
        } else {
            format!(
                "all backends failed for {country_code}: {}",
                triggering_errors.summary()
            )
        };
        let metadata =
            OrchestrationMetadata::degraded(carbon_context, triggering_errors.clone(), reason);
        (forecast, metadata)
    }

    /// Synthetic 24-hour series starting at `start`
    pub fn series_from(&self, start: DateTime<Utc>) -> ForecastResult {
        let rows = (0..EMERGENCY_HORIZON_HOURS)
            .map(|i| {
                let ts = start + Duration::hours(i as i64);
                let hour = ts.hour();
                ForecastRow::new(
                    ts,
                    vec![
                        (SOLAR_CHANNEL.to_string(), solar_mw(hour)),
                        (
                            WIND_ONSHORE_CHANNEL.to_string(),
                            wind_mw(hour, ONSHORE_BASELINE_MW, ONSHORE_AMPLITUDE_MW, 0.0),
                        ),
                        (
                            WIND_OFFSHORE_CHANNEL.to_string(),
                            wind_mw(
                                hour,
                                OFFSHORE_BASELINE_MW,
                                OFFSHORE_AMPLITUDE_MW,
                                OFFSHORE_PHASE,
                            ),
                        ),
                    ],
                )
            })
            .collect();

        ForecastResult::from_ordered_rows(EMERGENCY_BACKEND, rows)
    }
}

fn current_hour() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

fn solar_mw(hour: u32) -> f64 {
    if hour <= DAYLIGHT_START_HOUR || hour >= DAYLIGHT_END_HOUR {
        return 0.0;
    }
    let span = (DAYLIGHT_END_HOUR - DAYLIGHT_START_HOUR) as f64;
    let phase = (hour - DAYLIGHT_START_HOUR) as f64 / span;
    (SOLAR_PEAK_MW * (PI * phase).sin()).clamp(0.0, SOLAR_PEAK_MW)
}

fn wind_mw(hour: u32, baseline: f64, amplitude: f64, phase: f64) -> f64 {
    let angle = 2.0 * PI * hour as f64 / 24.0 + phase;
    (baseline + amplitude * angle.sin()).max(0.0)
}
