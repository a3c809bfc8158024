//! Types for carbon-aware routing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Coarse grid state derived from the carbon intensity band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarbonStatus {
    /// Clean grid: prefer the high-accuracy backend
    Low,
    /// Dirty grid: prefer the low-footprint backend
    High,
}

impl CarbonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarbonStatus::Low => "LOW",
            CarbonStatus::High => "HIGH",
        }
    }
}

impl fmt::Display for CarbonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a carbon mode override is neither `LOW` nor `HIGH`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid carbon mode '{0}', expected LOW or HIGH")]
pub struct ParseCarbonStatusError(pub String);

impl FromStr for CarbonStatus {
    type Err = ParseCarbonStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(CarbonStatus::Low),
            "HIGH" => Ok(CarbonStatus::High),
            _ => Err(ParseCarbonStatusError(s.to_string())),
        }
    }
}

/// A single carbon intensity sample
///
/// Created fresh for every orchestration request and never mutated.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CarbonReading {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Simulated carbon intensity in gCO2/kWh
    pub intensity_value: f64,
    /// Band the intensity was sampled from
    pub status: CarbonStatus,
    /// True when the caller forced the status
    pub manual_override: bool,
}

impl CarbonReading {
    pub const UNIT: &'static str = "gCO2/kWh";
}

#[derive(Serialize)]
struct ReadingView<'a> {
    timestamp: &'a DateTime<Utc>,
    intensity_value: f64,
    unit: &'static str,
    status: CarbonStatus,
    manual_override: bool,
}

impl Serialize for CarbonReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReadingView {
            timestamp: &self.timestamp,
            intensity_value: self.intensity_value,
            unit: Self::UNIT,
            status: self.status,
            manual_override: self.manual_override,
        }
        .serialize(serializer)
    }
}

/// Inclusive range of wall-clock hours treated as a demand peak
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl PeakWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }

    fn overlaps(&self, other: &PeakWindow) -> bool {
        self.start_hour <= other.end_hour && other.start_hour <= self.end_hour
    }
}

/// Half-open sampling band in gCO2/kWh
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct IntensityBand {
    pub min: f64,
    pub max: f64,
}

impl IntensityBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn range(&self) -> Range<f64> {
        self.min..self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        self.range().contains(&value)
    }
}

/// Carbon sensor configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CarbonSensorConfig {
    /// Sampling band used when the grid is clean
    pub low_band: IntensityBand,
    /// Sampling band used when the grid is dirty
    pub high_band: IntensityBand,
    /// Morning and evening demand peaks
    pub peak_windows: Vec<PeakWindow>,
}

impl Default for CarbonSensorConfig {
    fn default() -> Self {
        Self {
            low_band: IntensityBand::new(50.0, 180.0),
            high_band: IntensityBand::new(400.0, 650.0),
            peak_windows: vec![PeakWindow::new(8, 11), PeakWindow::new(17, 21)],
        }
    }
}

impl CarbonSensorConfig {
    /// Check band and window consistency
    pub fn validate(&self) -> Result<(), String> {
        for (label, band) in [("low_band", self.low_band), ("high_band", self.high_band)] {
            if !(band.min.is_finite() && band.max.is_finite()) || band.min < 0.0 {
                return Err(format!("{label} must be finite and non-negative"));
            }
            if band.min >= band.max {
                return Err(format!(
                    "{label} is empty: min {} >= max {}",
                    band.min, band.max
                ));
            }
        }
        if self.low_band.max > self.high_band.min {
            return Err(format!(
                "low_band [{}, {}) overlaps high_band [{}, {})",
                self.low_band.min, self.low_band.max, self.high_band.min, self.high_band.max
            ));
        }

        for window in &self.peak_windows {
            if window.start_hour > 23 || window.end_hour > 23 {
                return Err(format!(
                    "peak window {}-{} has an hour outside 0-23",
                    window.start_hour, window.end_hour
                ));
            }
            if window.start_hour > window.end_hour {
                return Err(format!(
                    "peak window {}-{} starts after it ends",
                    window.start_hour, window.end_hour
                ));
            }
        }
        for (i, a) in self.peak_windows.iter().enumerate() {
            for b in &self.peak_windows[i + 1..] {
                if a.overlaps(b) {
                    return Err(format!(
                        "peak windows {}-{} and {}-{} overlap",
                        a.start_hour, a.end_hour, b.start_hour, b.end_hour
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_carbon_status_case_insensitive() {
        assert_eq!("low".parse::<CarbonStatus>(), Ok(CarbonStatus::Low));
        assert_eq!(" High ".parse::<CarbonStatus>(), Ok(CarbonStatus::High));
        assert!("medium".parse::<CarbonStatus>().is_err());
    }

    #[test]
    fn test_carbon_status_serializes_uppercase() {
        let json = serde_json::to_string(&CarbonStatus::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
    }

    #[test]
    fn test_reading_serializes_unit() {
        let reading = CarbonReading {
            timestamp: Utc::now(),
            intensity_value: 123.4,
            status: CarbonStatus::Low,
            manual_override: false,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["unit"], "gCO2/kWh");
        assert_eq!(json["status"], "LOW");

        let back: CarbonReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_peak_window_is_inclusive() {
        let w = PeakWindow::new(8, 11);
        assert!(!w.contains(7));
        assert!(w.contains(8));
        assert!(w.contains(11));
        assert!(!w.contains(12));
    }

    #[test]
    fn test_default_sensor_config_is_valid() {
        assert!(CarbonSensorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overlapping_bands_rejected() {
        let config = CarbonSensorConfig {
            low_band: IntensityBand::new(50.0, 450.0),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("overlaps"));
    }

    #[test]
    fn test_overlapping_peak_windows_rejected() {
        let config = CarbonSensorConfig {
            peak_windows: vec![PeakWindow::new(8, 12), PeakWindow::new(12, 14)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_peak_window_rejected() {
        let config = CarbonSensorConfig {
            peak_windows: vec![PeakWindow::new(21, 17)],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("starts after"));
    }
}
