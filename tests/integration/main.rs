//! Integration tests using WireMock
//!
//! These tests drive the public API end to end: the HTTP pipeline over a
//! real reqwest transport against a mock server, and the translation
//! loader over files on disk.

mod http_pipeline;
mod i18n_loader;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Starts a fresh mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mock that only matches a bearer-authenticated request.
pub fn mock_with_auth(path_matcher: &str, method_matcher: &str, token: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
}

/// JSON error response template.
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}

/// JSON success response template.
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
