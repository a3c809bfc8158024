//! End-to-end routing scenarios against fake prediction backends

use std::time::Duration;

use carbon_forecast::carbon_aware::{CarbonSensor, CarbonStatus};
use carbon_forecast::config::{BackendConfig, OrchestratorConfig};
use carbon_forecast::forecast::{
    BackendClient, BackendDescriptor, BackendRole, ErrorKind, OrchestrationStatus, Orchestrator,
    EMERGENCY_BACKEND,
};
use chrono::Timelike;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HIGH_ACCURACY: &str = "xgboost";
const LOW_FOOTPRINT: &str = "holt-winters";

fn hourly_payload(model: &str, rows: usize) -> serde_json::Value {
    let data: Vec<_> = (0..rows)
        .map(|h| {
            json!({
                "datetime_utc": format!("2025-06-01T{h:02}:00:00"),
                "Solar": if (7..18).contains(&h) { 1500.0 } else { 0.0 },
                "Wind_Onshore": 2800.0 + h as f64,
                "Wind_Offshore": 700.0,
            })
        })
        .collect();
    json!({"model": model, "execution_carbon_kg": 0.0125, "data": data})
}

async fn backend(template: ResponseTemplate, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/predict/DE"))
        .respond_with(template)
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn healthy(model: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(hourly_payload(model, 24))
}

fn slow(model: &str) -> ResponseTemplate {
    healthy(model).set_delay(Duration::from_millis(1_500))
}

fn released_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn orchestrator(xgb: &MockServer, hw: &MockServer, timeout: Duration) -> Orchestrator {
    Orchestrator::new(
        CarbonSensor::default(),
        BackendClient::new().unwrap(),
        BackendDescriptor::new(HIGH_ACCURACY, xgb.uri(), timeout, BackendRole::HighAccuracy),
        BackendDescriptor::new(LOW_FOOTPRINT, hw.uri(), timeout, BackendRole::LowFootprint),
    )
    .unwrap()
}

#[tokio::test]
async fn html_error_page_is_a_protocol_failure() {
    let xgb = backend(
        ResponseTemplate::new(500).set_body_string("<html>Internal Server Error</html>"),
        1,
    )
    .await;
    let hw = backend(healthy(LOW_FOOTPRINT), 1).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_secs(5));

    let (_, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::Low))
        .await
        .unwrap();

    assert_eq!(meta.selected_backend(), LOW_FOOTPRINT);
    assert_eq!(meta.error_chain().entries()[0].kind, ErrorKind::ProtocolError);
}

#[tokio::test]
async fn scenario_a_low_carbon_uses_high_accuracy_backend() {
    let xgb = backend(healthy(HIGH_ACCURACY), 1).await;
    let hw = backend(healthy(LOW_FOOTPRINT), 0).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_secs(5));

    let (forecast, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::Low))
        .await
        .unwrap();

    assert_eq!(meta.selected_backend(), HIGH_ACCURACY);
    assert_eq!(meta.status(), OrchestrationStatus::Ok);
    assert_eq!(forecast.len(), 24);
    assert_eq!(
        forecast.channel_names(),
        ["Solar", "Wind_Onshore", "Wind_Offshore"]
    );
    assert!(meta.carbon_context().manual_override);
    assert!((50.0..180.0).contains(&meta.carbon_context().intensity_value));
}

#[tokio::test]
async fn scenario_b_high_carbon_uses_low_footprint_backend() {
    let xgb = backend(healthy(HIGH_ACCURACY), 0).await;
    let hw = backend(healthy(LOW_FOOTPRINT), 1).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_secs(5));

    let (_, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::High))
        .await
        .unwrap();

    assert_eq!(meta.selected_backend(), LOW_FOOTPRINT);
    assert!(!meta.is_fallback());
    assert!((400.0..650.0).contains(&meta.carbon_context().intensity_value));
}

#[tokio::test]
async fn scenario_c_primary_http_500_falls_back() {
    let xgb = backend(
        ResponseTemplate::new(500).set_body_json(json!({"detail": "model not loaded"})),
        1,
    )
    .await;
    let hw = backend(healthy(LOW_FOOTPRINT), 1).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_secs(5));

    let (forecast, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::Low))
        .await
        .unwrap();

    assert_eq!(meta.selected_backend(), LOW_FOOTPRINT);
    assert_eq!(meta.status(), OrchestrationStatus::Ok);
    assert!(meta.is_fallback());
    assert_eq!(meta.error_chain().len(), 1);
    assert_eq!(meta.error_chain().entries()[0].backend, HIGH_ACCURACY);
    assert_eq!(meta.error_chain().entries()[0].kind, ErrorKind::HttpError);
    assert_eq!(forecast.len(), 24);
}

#[tokio::test]
async fn scenario_d_both_time_out_degrades() {
    let xgb = backend(slow(HIGH_ACCURACY), 1).await;
    let hw = backend(slow(LOW_FOOTPRINT), 1).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_millis(200));

    let (forecast, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::Low))
        .await
        .unwrap();

    assert_eq!(meta.status(), OrchestrationStatus::Degraded);
    assert_eq!(meta.selected_backend(), EMERGENCY_BACKEND);
    assert_eq!(meta.execution_footprint_kg(), 0.0);
    assert_eq!(meta.error_chain().len(), 2);
    assert!(meta
        .error_chain()
        .entries()
        .iter()
        .all(|a| a.kind == ErrorKind::Timeout));

    assert_eq!(forecast.len(), 24);
    for row in forecast.rows() {
        assert!(row.channels().iter().all(|(_, v)| *v >= 0.0));
        let hour = row.timestamp().hour();
        if !(6..=18).contains(&hour) {
            assert_eq!(row.channel("Solar"), Some(0.0));
        }
    }
}

#[tokio::test]
async fn protocol_error_on_primary_is_recorded() {
    let xgb = backend(
        ResponseTemplate::new(200).set_body_json(json!({"model": HIGH_ACCURACY})),
        1,
    )
    .await;
    let hw = backend(healthy(LOW_FOOTPRINT), 1).await;
    let orch = orchestrator(&xgb, &hw, Duration::from_secs(5));

    let (_, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::Low))
        .await
        .unwrap();

    assert_eq!(meta.selected_backend(), LOW_FOOTPRINT);
    assert_eq!(meta.error_chain().entries()[0].kind, ErrorKind::ProtocolError);
    assert!(meta.error_chain().entries()[0].detail.contains("missing data"));
}

#[tokio::test]
async fn unreachable_backends_degrade_without_panicking() {
    let closed = format!("http://127.0.0.1:{}", released_port());
    let config = OrchestratorConfig {
        high_accuracy: BackendConfig::new(HIGH_ACCURACY, closed.as_str(), 5_000),
        low_footprint: BackendConfig::new(LOW_FOOTPRINT, closed.as_str(), 5_000),
        ..Default::default()
    };
    let orch = Orchestrator::from_config(&config).unwrap();

    let (forecast, meta) = orch
        .get_optimized_forecast("DE", Some(CarbonStatus::High))
        .await
        .unwrap();

    assert_eq!(meta.status(), OrchestrationStatus::Degraded);
    assert_eq!(meta.error_chain().entries()[0].backend, LOW_FOOTPRINT);
    assert_eq!(meta.error_chain().entries()[1].backend, HIGH_ACCURACY);
    assert!(meta
        .error_chain()
        .entries()
        .iter()
        .all(|a| a.kind == ErrorKind::Unreachable));
    assert_eq!(forecast.len(), 24);
}

#[tokio::test]
async fn round_trip_preserves_row_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/predict/AT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hourly_payload(HIGH_ACCURACY, 7)))
        .expect(1)
        .mount(&server)
        .await;
    let hw = MockServer::start().await;
    let orch = orchestrator(&server, &hw, Duration::from_secs(5));

    let (forecast, _) = orch
        .get_optimized_forecast("AT", Some(CarbonStatus::Low))
        .await
        .unwrap();
    assert_eq!(forecast.len(), 7);
    assert_eq!(forecast.model(), HIGH_ACCURACY);
}

#[test]
fn grid_status_probe_is_stable_under_override() {
    let config = OrchestratorConfig::default();
    let orch = Orchestrator::from_config(&config).unwrap();
    for mode in [CarbonStatus::Low, CarbonStatus::High] {
        let a = orch.get_live_grid_status(Some(mode));
        let b = orch.get_live_grid_status(Some(mode));
        assert_eq!(a.status, mode);
        assert_eq!(a.status, b.status);
    }
}
