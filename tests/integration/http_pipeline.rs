//! Integration tests for the HTTP pipeline

use super::*;
use app_shell_core::auth::StaticTokenProvider;
use app_shell_core::observability::DefaultMetricsCollector;
use app_shell_core::resilience::{RetryConfig, RetryInterceptor};
use app_shell_core::{HttpClient, HttpClientConfig, HttpTransport, ReqwestTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, query_param};

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .header("Content-Type", "application/json")
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .build()
        .expect("valid config");

    HttpClient::builder()
        .config(config)
        .build()
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_orders_request_carries_defaults_and_token() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/orders", "GET", "T")
        .and(header("Content-Type", "application/json"))
        .respond_with(success_response(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.attach_auth_interceptor(Arc::new(StaticTokenProvider::with_token("T")));
    client.attach_auth_interceptor(Arc::new(StaticTokenProvider::with_token("other")));

    let orders: serde_json::Value = client.get("/orders").await.expect("request succeeds");
    assert_eq!(orders, json!([{"id": 1}, {"id": 2}]));
}

#[tokio::test]
async fn test_not_found_surfaces_status_error() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .respond_with(error_response(404, json!({"message": "order 42 not found"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .get::<serde_json::Value>("/orders/42")
        .await
        .unwrap_err();

    assert_eq!(err.name(), "HttpError");
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.message(), "order 42 not found");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(success_response(json!({})).set_delay(Duration::from_millis(800)))
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(DefaultMetricsCollector::new());
    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .timeout_ms(50)
        .build()
        .unwrap();
    let client = HttpClient::builder()
        .config(config)
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let err = client.get::<serde_json::Value>("/slow").await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.name(), "TimeoutError");
    assert_eq!(err.message(), "Request timeout");

    use app_shell_core::observability::MetricsCollector;
    assert_eq!(metrics.get_metrics().timeouts, 1);
}

#[tokio::test]
async fn test_retry_interceptor_recovers_from_unavailable() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(error_response(503, json!({"message": "busy"})))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(success_response(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new().unwrap());
    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();
    let client = HttpClient::builder()
        .config(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    client.add_error_interceptor(Arc::new(RetryInterceptor::new(
        transport,
        RetryConfig::new()
            .initial_delay(Duration::from_millis(5))
            .jitter(false),
    )));

    let body: serde_json::Value = client.get("/flaky").await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_post_json_sends_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({"sku": "A-1", "qty": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let created: serde_json::Value = client
        .post_json("orders", &json!({"sku": "A-1", "qty": 2}))
        .await
        .unwrap();
    assert_eq!(created["id"], 9);
}

#[tokio::test]
async fn test_absolute_url_ignores_base() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(success_response(json!({"status": "up"})))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url("https://unreachable.invalid")
        .build()
        .unwrap();
    let client = HttpClient::builder().config(config).build().unwrap();

    let health: serde_json::Value = client
        .get(&format!("{}/health", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(health["status"], "up");
}

#[tokio::test]
async fn test_query_parameters_reach_the_server() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("api-version", "2"))
        .and(query_param("status", "open"))
        .respond_with(success_response(json!([{"id": 3}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .query("api-version", "2")
        .build()
        .unwrap();
    let client = HttpClient::builder().config(config).build().unwrap();

    let orders: serde_json::Value = client
        .request_json("/orders", HttpClientConfig::new().with_query("status", "open"))
        .await
        .unwrap();
    assert_eq!(orders, json!([{"id": 3}]));
}

#[tokio::test]
async fn test_client_level_timeout_reports_no_duration() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(success_response(json!({})).set_delay(Duration::from_millis(800)))
        .mount(&mock_server)
        .await;

    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap();
    let client = HttpClient::builder()
        .config(config)
        .transport(Arc::new(ReqwestTransport::with_client(reqwest_client)))
        .build()
        .unwrap();

    let err = client.get::<serde_json::Value>("/slow").await.unwrap_err();
    assert!(matches!(
        err,
        app_shell_core::HttpClientError::Timeout { timeout: None, .. }
    ));
}
