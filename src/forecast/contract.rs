//! Backend wire contract
//!
//! Every prediction backend answers `GET {base}/predict/{country}` with
//!
//! ```json
//! { "model": "xgboost", "execution_carbon_kg": 0.0021,
//!   "data": [ { "datetime_utc": "2025-06-01T00:00:00Z", "Solar": 0.0, "Wind_Onshore": 3120.4 } ] }
//! ```
//!
//! Parsing here is the single place where payloads are validated. Anything that
//! does not match the canonical shape is reported as a protocol violation.

use crate::forecast::types::{ForecastResult, ForecastRow, TOTAL_FIELD};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Row field holding the timestamp
pub const TIMESTAMP_FIELD: &str = "datetime_utc";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Validated backend answer
#[derive(Clone, Debug, PartialEq)]
pub struct BackendPayload {
    pub forecast: ForecastResult,
    /// Footprint reported by the backend, never negative
    pub execution_carbon_kg: f64,
}

/// Parse and validate a raw response body
///
/// `default_model` labels the series when the payload carries no `model`.
pub fn parse_payload(body: &[u8], default_model: &str) -> Result<BackendPayload, String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("body is not valid JSON: {e}"))?;

    let obj = match value {
        Value::Object(obj) => obj,
        Value::Array(_) => {
            return Err("legacy list payload; expected an object with a data field".to_string())
        }
        other => return Err(format!("expected a JSON object, got {}", json_type(&other))),
    };

    let model = obj
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(default_model)
        .to_string();

    let execution_carbon_kg = obj
        .get("execution_carbon_kg")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .unwrap_or(0.0);

    let data = match obj.get("data") {
        None | Some(Value::Null) => return Err("missing data field".to_string()),
        Some(Value::Array(rows)) if rows.is_empty() => {
            return Err("data field is empty".to_string())
        }
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(format!(
                "data field must be a list, got {}",
                json_type(other)
            ))
        }
    };

    let rows = data
        .iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(fields) => parse_row(i, fields),
            other => Err(format!("row {i} must be an object, got {}", json_type(other))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let forecast = ForecastResult::new(model, rows)?;

    Ok(BackendPayload {
        forecast,
        execution_carbon_kg,
    })
}

fn parse_row(index: usize, fields: &Map<String, Value>) -> Result<ForecastRow, String> {
    let raw_ts = fields
        .get(TIMESTAMP_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("row {index}: missing {TIMESTAMP_FIELD}"))?;
    let timestamp = parse_timestamp(raw_ts)
        .ok_or_else(|| format!("row {index}: unparseable timestamp '{raw_ts}'"))?;

    let mut channels = Vec::with_capacity(fields.len().saturating_sub(1));
    for (name, value) in fields {
        if name == TIMESTAMP_FIELD || name.eq_ignore_ascii_case(TOTAL_FIELD) {
            continue;
        }
        let number = coerce_channel(value).ok_or_else(|| {
            format!(
                "row {index}: channel '{name}' is not numeric ({})",
                json_type(value)
            )
        })?;
        channels.push((name.clone(), number));
    }

    if channels.is_empty() {
        return Err(format!("row {index}: no channel fields"));
    }

    Ok(ForecastRow::new(timestamp, channels))
}

fn coerce_channel(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Parse RFC 3339, or a naive ISO-8601 date-time read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
