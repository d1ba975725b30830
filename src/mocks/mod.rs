//! Mock implementations for testing.
//!
//! Provides a scripted transport and a counting resource loader so the
//! pipeline and the resource cache can be tested without network or disk.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{I18nError, I18nResult};
use crate::i18n::{ResourceLoader, TranslationResource};
use crate::transport::{Headers, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a successful JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// Creates an error response with a JSON `message` field.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(&serde_json::json!({ "message": message })).with_status(status)
    }

    /// Creates a plain-text response.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Creates a response with custom status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

impl From<MockResponse> for HttpResponse {
    fn from(mock: MockResponse) -> Self {
        HttpResponse {
            status: mock.status,
            headers: mock.headers,
            body: mock.body.into(),
        }
    }
}

enum Scripted {
    Respond(MockResponse),
    Fail(TransportError),
}

/// Mock HTTP transport that replays queued outcomes in order.
///
/// Every request is recorded. When the queue is empty the transport answers
/// `500` with a "No mock response configured" message.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        self.script.lock().push_back(Scripted::Respond(response));
    }

    /// Queues a JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an error response.
    pub fn queue_error(&self, status: u16, message: &str) {
        self.queue(MockResponse::error(status, message));
    }

    /// Queues a transport-level failure.
    pub fn queue_failure(&self, error: TransportError) {
        self.script.lock().push_back(Scripted::Fail(error));
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response.into()),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(MockResponse::error(500, "No mock response configured").into()),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Resource loader serving in-memory resources and counting calls.
#[derive(Debug, Default)]
pub struct MockResourceLoader {
    resources: HashMap<(String, String), TranslationResource>,
    latency: Option<Duration>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl MockResourceLoader {
    /// Creates a loader with no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource. Non-object values are stored as an empty object.
    pub fn with_resource(
        mut self,
        namespace: &str,
        language: &str,
        value: serde_json::Value,
    ) -> Self {
        let resource = match value {
            serde_json::Value::Object(map) => map,
            _ => TranslationResource::new(),
        };
        self.resources
            .insert((namespace.to_string(), language.to_string()), resource);
        self
    }

    /// Delays every load by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the first `count` loads fail.
    pub fn fail_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Returns how many times the loader was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceLoader for MockResourceLoader {
    async fn load(&self, namespace: &str, language: &str) -> I18nResult<TranslationResource> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(I18nError::load(namespace, language, "simulated failure"));
        }

        self.resources
            .get(&(namespace.to_string(), language.to_string()))
            .cloned()
            .ok_or_else(|| I18nError::not_found(namespace, language))
    }
}
