//! Forecast series shared by the backends, the emergency generator and the API

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Timestamp format used when rows are serialized for callers
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the derived column in serialized rows
pub const TOTAL_FIELD: &str = "total";

/// One hourly row of generation channels
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastRow {
    timestamp: DateTime<Utc>,
    channels: Vec<(String, f64)>,
    total: f64,
}

impl ForecastRow {
    /// Build a row, flooring negative channel values at zero
    pub fn new(timestamp: DateTime<Utc>, channels: Vec<(String, f64)>) -> Self {
        let channels: Vec<(String, f64)> = channels
            .into_iter()
            .map(|(name, value)| (name, value.max(0.0)))
            .collect();
        let total = channels.iter().map(|(_, v)| v).sum();
        Self {
            timestamp,
            channels,
            total,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn channels(&self) -> &[(String, f64)] {
        &self.channels
    }

    /// Value of a named channel, if present
    pub fn channel(&self, name: &str) -> Option<f64> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Sum of all channels
    pub fn total(&self) -> f64 {
        self.total
    }
}

impl Serialize for ForecastRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len() + 2))?;
        map.serialize_entry(
            "datetime_utc",
            &self.timestamp.format(ROW_TIMESTAMP_FORMAT).to_string(),
        )?;
        for (name, value) in &self.channels {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(TOTAL_FIELD, &self.total)?;
        map.end()
    }
}

/// Time-ordered forecast series
///
/// Rows are strictly increasing in time, so timestamps are also unique.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastResult {
    model: String,
    rows: Vec<ForecastRow>,
}

impl ForecastResult {
    /// Build a series, rejecting out-of-order or duplicate timestamps
    pub fn new(model: impl Into<String>, rows: Vec<ForecastRow>) -> Result<Self, String> {
        if let Some(pair) = rows
            .windows(2)
            .find(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err(format!(
                "timestamps not strictly increasing: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            ));
        }
        Ok(Self {
            model: model.into(),
            rows,
        })
    }

    /// Build a series from rows the caller generated in order
    pub(crate) fn from_ordered_rows(model: impl Into<String>, rows: Vec<ForecastRow>) -> Self {
        debug_assert!(rows.windows(2).all(|p| p[0].timestamp < p[1].timestamp));
        Self {
            model: model.into(),
            rows,
        }
    }

    /// Model label reported by the producer
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ForecastRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Channel names of the first row, in order
    pub fn channel_names(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.channels.iter().map(|(n, _)| n.as_str()).collect())
            .unwrap_or_default()
    }
}
