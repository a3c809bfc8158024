//! Gateway configuration
//!
//! Built-in defaults, optionally replaced by a TOML file, then overridden
//! field by field from the command line or environment.
//!
//! ```toml
//! [high_accuracy]
//! name = "xgboost"
//! base_url = "http://xgb_predict_service:8001"
//! timeout_ms = 15000
//!
//! [low_footprint]
//! name = "holt-winters"
//! base_url = "http://hw_predict_service:8002"
//! timeout_ms = 10000
//!
//! [sensor]
//! peak_windows = [{ start_hour = 8, end_hour = 11 }, { start_hour = 17, end_hour = 21 }]
//! ```

use crate::carbon_aware::CarbonSensorConfig;
use crate::error::{Error, Result};
use crate::forecast::backend::{BackendDescriptor, BackendRole};
use crate::forecast::EMERGENCY_BACKEND;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One prediction backend
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendConfig {
    pub name: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn descriptor(&self, role: BackendRole) -> BackendDescriptor {
        BackendDescriptor::new(
            self.name.clone(),
            normalize_base_url(&self.base_url),
            self.timeout(),
            role,
        )
    }

    fn validate(&self, slot: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ConfigError(format!("{slot}: backend name is empty")));
        }
        if self.name == EMERGENCY_BACKEND {
            return Err(Error::ConfigError(format!(
                "{slot}: backend name '{EMERGENCY_BACKEND}' is reserved"
            )));
        }
        let url = Url::parse(&normalize_base_url(&self.base_url)).map_err(|e| {
            Error::ConfigError(format!("{slot}: invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!(
                "{slot}: base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError(format!("{slot}: timeout_ms must be > 0")));
        }
        Ok(())
    }
}

/// Full orchestrator configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Backend preferred while the grid is clean
    pub high_accuracy: BackendConfig,
    /// Backend preferred while the grid is dirty
    pub low_footprint: BackendConfig,
    pub sensor: CarbonSensorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            high_accuracy: BackendConfig::new("xgboost", "http://xgb_predict_service:8001", 15_000),
            low_footprint: BackendConfig::new(
                "holt-winters",
                "http://hw_predict_service:8002",
                10_000,
            ),
            sensor: CarbonSensorConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Read a TOML file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Defaults, or the given file when present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command line / environment overrides
    pub fn apply(&mut self, overrides: &BackendOverrides) {
        if let Some(url) = &overrides.high_accuracy_url {
            self.high_accuracy.base_url = url.clone();
        }
        if let Some(ms) = overrides.high_accuracy_timeout_ms {
            self.high_accuracy.timeout_ms = ms;
        }
        if let Some(url) = &overrides.low_footprint_url {
            self.low_footprint.base_url = url.clone();
        }
        if let Some(ms) = overrides.low_footprint_timeout_ms {
            self.low_footprint.timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.high_accuracy.validate("high_accuracy")?;
        self.low_footprint.validate("low_footprint")?;
        if self.high_accuracy.name == self.low_footprint.name {
            return Err(Error::ConfigError(format!(
                "both backends are named '{}'",
                self.high_accuracy.name
            )));
        }
        self.sensor
            .validate()
            .map_err(|e| Error::ConfigError(format!("sensor: {e}")))
    }

    pub fn high_accuracy_descriptor(&self) -> BackendDescriptor {
        self.high_accuracy.descriptor(BackendRole::HighAccuracy)
    }

    pub fn low_footprint_descriptor(&self) -> BackendDescriptor {
        self.low_footprint.descriptor(BackendRole::LowFootprint)
    }
}

/// Field-level overrides, usually sourced from the environment
#[derive(Clone, Debug, Default)]
pub struct BackendOverrides {
    pub high_accuracy_url: Option<String>,
    pub high_accuracy_timeout_ms: Option<u64>,
    pub low_footprint_url: Option<String>,
    pub low_footprint_timeout_ms: Option<u64>,
}

/// Strip trailing slashes and a legacy `/predict` suffix
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/predict")
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon_aware::PeakWindow;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.high_accuracy_descriptor().timeout, Duration::from_secs(15));
        assert_eq!(config.low_footprint_descriptor().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://a:1/"), "http://a:1");
        assert_eq!(
            normalize_base_url("http://xgb_predict_service:8001/predict/"),
            "http://xgb_predict_service:8001"
        );
        assert_eq!(normalize_base_url("http://a/models"), "http://a/models");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = OrchestratorConfig::default();
        config.low_footprint.name = "xgboost".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("both backends"));
    }

    #[test]
    fn test_reserved_name_rejected() {
        let mut config = OrchestratorConfig::default();
        config.high_accuracy.name = EMERGENCY_BACKEND.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_and_timeout_rejected() {
        let mut config = OrchestratorConfig::default();
        config.low_footprint.base_url = "ftp://files".to_string();
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.high_accuracy.timeout_ms = 0;
        assert!(config.validate().unwrap_err().to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = OrchestratorConfig::default();
        config.apply(&BackendOverrides {
            high_accuracy_url: Some("http://localhost:8001".to_string()),
            low_footprint_timeout_ms: Some(2_500),
            ..Default::default()
        });
        assert_eq!(config.high_accuracy.base_url, "http://localhost:8001");
        assert_eq!(config.high_accuracy.timeout_ms, 15_000);
        assert_eq!(config.low_footprint.timeout_ms, 2_500);
    }

    #[test]
    fn test_load_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[low_footprint]
name = "eco"
base_url = "http://localhost:9002"
timeout_ms = 500

[sensor]
peak_windows = [{{ start_hour = 6, end_hour = 9 }}]
"#
        )
        .unwrap();

        let config = OrchestratorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.low_footprint.name, "eco");
        assert_eq!(config.high_accuracy.name, "xgboost");
        assert_eq!(config.sensor.peak_windows, vec![PeakWindow::new(6, 9)]);
        assert_eq!(config.sensor.low_band.min, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "high_accuracy = 12").unwrap();
        let err = OrchestratorConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::TomlError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = OrchestratorConfig::load(Some(Path::new("/nonexistent/forecast.toml")))
            .unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
