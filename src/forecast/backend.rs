//! HTTP client for prediction backends
//!
//! One call, one attempt. Retrying and falling back are the orchestrator's job,
//! so this client neither retries nor logs: it returns a normalized forecast or
//! a classified [`BackendError`].

use crate::error::{Error, Result};
use crate::forecast::contract::{parse_payload, BackendPayload};
use reqwest::{Client, Url};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which routing slot a backend fills
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendRole {
    /// Heavier model, preferred while the grid is clean
    HighAccuracy,
    /// Cheap model, preferred while the grid is dirty
    LowFootprint,
}

/// Immutable description of one prediction backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: String,
    pub base_url: String,
    pub timeout: Duration,
    pub role: BackendRole,
}

impl BackendDescriptor {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        role: BackendRole,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout,
            role,
        }
    }

    /// `{base_url}/predict/{country_code}`
    pub fn predict_url(&self, country_code: &str) -> std::result::Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid base URL '{}': {e}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| format!("base URL '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["predict", country_code]);
        Ok(url)
    }
}

/// Stable label for a classified failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Unreachable,
    HttpError,
    ProtocolError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::HttpError => "http_error",
            ErrorKind::ProtocolError => "protocol_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected failure modes of a backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No complete response within the backend's timeout
    #[error("request timed out")]
    Timeout,

    /// Connection could not be established
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with a non-2xx status and a JSON error body
    #[error("backend returned HTTP {0}")]
    HttpStatus(u16),

    /// Payload broke the wire contract, or a non-2xx body was not JSON
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Timeout => ErrorKind::Timeout,
            BackendError::Unreachable(_) => ErrorKind::Unreachable,
            BackendError::HttpStatus(_) => ErrorKind::HttpError,
            BackendError::Protocol(_) => ErrorKind::ProtocolError,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Protocol(err.to_string())
        } else {
            BackendError::Unreachable(err.to_string())
        }
    }
}

/// Shared HTTP client for all backend calls
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
}

impl BackendClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("carbon-forecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::HttpError)?;
        Ok(Self { http })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Issue exactly one `GET {base}/predict/{country_code}` bounded by `timeout`
    pub async fn call(
        &self,
        descriptor: &BackendDescriptor,
        country_code: &str,
        timeout: Duration,
    ) -> std::result::Result<BackendPayload, BackendError> {
        let url = descriptor
            .predict_url(country_code)
            .map_err(BackendError::Unreachable)?;

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(BackendError::from_transport)?;

        if !status.is_success() {
            // A JSON error body (e.g. `{"detail": ...}`) is a well-formed refusal
            return match serde_json::from_slice::<serde_json::Value>(&body) {
                Ok(_) => Err(BackendError::HttpStatus(status.as_u16())),
                Err(e) => Err(BackendError::Protocol(format!(
                    "HTTP {} with unparseable body: {e}",
                    status.as_u16()
                ))),
            };
        }

        parse_payload(&body, &descriptor.name).map_err(BackendError::Protocol)
    }
}
