//! HTTP handlers for the REST API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, instrument};

use crate::carbon_aware::{CarbonReading, CarbonStatus};
use crate::forecast::{CancelHandle, Orchestrator};
use crate::Error;

use super::dto::{CarbonModeQuery, ErrorResponse, ForecastResponse, HealthResponse, StatusBanner};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Trips the cancel handle if the handler future is dropped mid-request
struct CancelOnDrop(Option<CancelHandle>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.cancel();
        }
    }
}

fn parse_carbon_mode(query: &CarbonModeQuery) -> Result<Option<CarbonStatus>, ApiError> {
    query
        .carbon_mode
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(str::parse::<CarbonStatus>)
        .transpose()
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("invalid_carbon_mode", &e.to_string())),
            )
        })
}

/// API banner
pub async fn home() -> Json<StatusBanner> {
    Json(StatusBanner {
        status: "API is running. Use /forecast/optimized/{country_code}".to_string(),
    })
}

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Carbon-aware forecast for one country
#[instrument(skip(state, query), fields(country = %country_code))]
pub async fn optimized_forecast(
    State(state): State<AppState>,
    Path(country_code): Path<String>,
    Query(query): Query<CarbonModeQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let carbon_mode = parse_carbon_mode(&query)?;
    let country_code = country_code.trim().to_string();
    if country_code.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid_country", "country code is empty")),
        ));
    }

    info!("Forecast request for {} (override: {:?})", country_code, carbon_mode);

    // Run detached so a client disconnect cannot abort an in-flight backend call
    let cancel = CancelHandle::new();
    let guard = CancelOnDrop(Some(cancel.clone()));
    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .get_optimized_forecast_with_cancel(&country_code, carbon_mode, &cancel)
            .await
    });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(join_err) => {
            error!("Forecast task aborted: {}", join_err);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("aborted", &join_err.to_string())),
            ));
        }
    };
    guard.disarm();

    match outcome {
        Ok((forecast, metadata)) => Ok(Json(ForecastResponse {
            metadata,
            forecast: forecast.into_rows(),
        })),
        Err(Error::Cancelled) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("cancelled", &Error::Cancelled.to_string())),
        )),
        Err(e) => {
            error!("Forecast orchestration failed: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("orchestration_failed", &e.to_string())),
            ))
        }
    }
}

/// Current grid carbon status; never calls a backend
#[instrument(skip(state, query))]
pub async fn grid_status(
    State(state): State<AppState>,
    Query(query): Query<CarbonModeQuery>,
) -> Result<Json<CarbonReading>, ApiError> {
    let carbon_mode = parse_carbon_mode(&query)?;
    Ok(Json(state.orchestrator.get_live_grid_status(carbon_mode)))
}

/// Metrics endpoint handler
#[cfg(feature = "metrics")]
pub async fn metrics() -> Result<String, StatusCode> {
    crate::metrics::encode().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_carbon_mode() {
        let q = |m: Option<&str>| CarbonModeQuery {
            carbon_mode: m.map(str::to_string),
        };
        assert_eq!(parse_carbon_mode(&q(None)).unwrap(), None);
        assert_eq!(parse_carbon_mode(&q(Some(""))).unwrap(), None);
        assert_eq!(
            parse_carbon_mode(&q(Some("high"))).unwrap(),
            Some(CarbonStatus::High)
        );
        let (status, _) = parse_carbon_mode(&q(Some("purple"))).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cancel_on_drop_trips_handle() {
        let handle = CancelHandle::new();
        {
            let _guard = CancelOnDrop(Some(handle.clone()));
        }
        assert!(handle.is_cancelled());

        let handle = CancelHandle::new();
        CancelOnDrop(Some(handle.clone())).disarm();
        assert!(!handle.is_cancelled());
    }
}
