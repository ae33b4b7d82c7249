//! End-to-end pipeline scenarios against mock SOAP backends.

use crate::mock_backend::SoapMockBuilder;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use gateway_core::{
    config::{AppConfig, BreakerConfig, ClientConfig, EndpointsConfig, RetryConfig},
    metrics::MetricsCollector,
    pipeline::RequestPipeline,
};
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;

fn test_config(base: &str) -> AppConfig {
    AppConfig {
        endpoints: EndpointsConfig {
            ord_po: format!("{base}/ord/po"),
            ord_esb: format!("{base}/ord/esb"),
            crm_po: format!("{base}/crm/po"),
            crm_esb: format!("{base}/crm/esb"),
            stub: format!("{base}/stub"),
            ..EndpointsConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_factor: 2.0,
        },
        breaker: BreakerConfig {
            window_size: 4,
            min_calls: 2,
            failure_rate_threshold: 50.0,
            open_cooldown_secs: 60,
            ..BreakerConfig::default()
        },
        client: ClientConfig {
            call_timeout_ms: 2000,
            acquire_timeout_ms: 200,
            ..ClientConfig::default()
        },
        ..AppConfig::default()
    }
}

fn pipeline_for(base: &str) -> RequestPipeline {
    RequestPipeline::new(&test_config(base), Arc::new(MetricsCollector::new())).unwrap()
}

fn request_body(app: &str, fn_name: &str, data: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "svcRequestInfoDTO": {
            "appName": app,
            "svcName": "order",
            "fnName": fn_name,
            "oderId": "ORD-42",
            "options": {}
        },
        "data": data
    }))
    .unwrap()
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
    headers
}

fn parse(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
#[serial]
async fn ord_request_routes_to_esb_and_returns_data() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_success("/ord/esb", "<orderNo>ORD-9</orderNo>").await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("ORD1", "create", json!({"itemCd": "A100"}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::OK);
    let parsed = parse(&response.body);
    assert_eq!(parsed["responseType"], "I");
    assert_eq!(parsed["data"]["service_response"]["orderNo"], "ORD-9");
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn success_with_unusual_body_root_keeps_payload() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_success_raw_body("/ord/esb", "<otherRoot><x>1</x></otherRoot>").await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("ORD1", "create", json!({}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::OK);
    let parsed = parse(&response.body);
    assert_eq!(parsed["responseType"], "I");
    assert_eq!(parsed["data"]["otherRoot"]["x"], "1");
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn service_function_routes_to_po() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_success("/ord/po", "<ok>y</ok>").await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("ORD1", "service", json!({}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::OK);
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn crm_domain_routes_to_crm_esb() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_success("/crm/esb", "<ok>y</ok>").await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("NCRM", "lookup", json!({}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::OK);
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn company_code_override_routes_to_stub_with_header() {
    let mut backend = SoapMockBuilder::new().await;
    backend
        .mock_success_expecting_header("/stub", ("KOL-Cmpn-Cd", "B123"), "<ok>y</ok>")
        .await;

    let pipeline = pipeline_for(&backend.url());
    let mut headers = json_headers();
    headers.insert("KOL-Cmpn-Cd", "B123".parse().unwrap());
    let body = request_body("ORD1", "create", json!({}));
    let response = pipeline.handle(&headers, &body).await;

    assert_eq!(response.status, StatusCode::OK);
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn business_error_passes_through_at_http_200() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_business_error("/ord/esb", "ORD-E001", "invalid order").await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("ORD1", "create", json!({}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::OK);
    let parsed = parse(&response.body);
    assert_eq!(parsed["responseType"], "E");
    assert_eq!(parsed["responseCode"], "ORD-E001");
    assert_eq!(parsed["responseTitle"], "invalid order");
    assert_eq!(parsed["data"], Value::Null);
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn retry_exhaustion_yields_502_then_circuit_fast_fails() {
    let mut backend = SoapMockBuilder::new().await;
    // max_attempts = 2, so exactly two hits; the follow-up request must
    // be rejected by the breaker without reaching the network.
    backend.mock_failure("/ord/esb", 503, 2).await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("ORD1", "create", json!({}));

    let response = pipeline.handle(&json_headers(), &body).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse(&response.body)["error"], "backend_error");

    let response = pipeline.handle(&json_headers(), &body).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse(&response.body)["error"], "circuit_open");

    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn unknown_app_name_is_a_routing_error() {
    let backend = SoapMockBuilder::new().await;

    let pipeline = pipeline_for(&backend.url());
    let body = request_body("UNKNOWN", "create", json!({}));
    let response = pipeline.handle(&json_headers(), &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&response.body)["error"], "routing_error");
}

#[tokio::test]
#[serial]
async fn malformed_body_is_a_validation_error() {
    let backend = SoapMockBuilder::new().await;

    let pipeline = pipeline_for(&backend.url());
    let response = pipeline.handle(&json_headers(), b"not json").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&response.body)["error"], "validation_error");
}

#[tokio::test]
#[serial]
async fn xml_caller_receives_soap_shaped_reply() {
    let mut backend = SoapMockBuilder::new().await;
    backend.mock_success("/ord/esb", "<orderNo>ORD-9</orderNo>").await;

    let pipeline = pipeline_for(&backend.url());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "text/xml".parse().unwrap());
    let body = request_body("ORD1", "create", json!({}));
    let response = pipeline.handle(&headers, &body).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "text/xml");
    let xml = String::from_utf8(response.body).unwrap();
    assert!(xml.contains("<responseType>I</responseType>"));
    assert!(xml.contains("<orderNo>ORD-9</orderNo>"));
    backend.assert_all().await;
}

#[tokio::test]
#[serial]
async fn unsupported_content_type_is_rejected_with_415() {
    let backend = SoapMockBuilder::new().await;

    let pipeline = pipeline_for(&backend.url());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "image/png".parse().unwrap());
    let body = request_body("ORD1", "create", json!({}));
    let response = pipeline.handle(&headers, &body).await;

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(parse(&response.body)["error"], "unsupported_media_type");
}
