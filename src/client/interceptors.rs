//! Interceptor traits and chain executors.
//!
//! Three ordered chains surround every request:
//!
//! - request interceptors transform the outgoing [`HttpRequest`];
//! - response interceptors transform a successful [`HttpResponse`];
//! - error interceptors see a normalized [`HttpClientError`] and either
//!   recover (return `Ok`) or pass an error on (return `Err`).
//!
//! Each chain runs strictly in registration order, one interceptor fully
//! awaited before the next starts.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::errors::{HttpClientError, HttpResult};
use crate::transport::{HttpRequest, HttpResponse};

/// Header set by [`RequestIdInterceptor`].
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Transforms outgoing requests.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Returns the request to hand to the next interceptor.
    async fn on_request(&self, request: HttpRequest) -> HttpResult<HttpRequest>;
}

/// Transforms successful responses.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Returns the response to hand to the next interceptor.
    async fn on_response(&self, response: HttpResponse) -> HttpResult<HttpResponse>;
}

/// Recovers from, or replaces, pipeline errors.
#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    /// `Ok` settles the request with a substitute response and skips the
    /// rest of the chain. `Err` hands that error to the next interceptor.
    async fn on_error(&self, error: HttpClientError, ctx: &ErrorContext)
        -> HttpResult<HttpResponse>;
}

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Building the request or running request interceptors.
    Request,
    /// The network call (including the timeout race).
    Transport,
    /// Status check, response interceptors or decoding.
    Response,
}

/// Context handed to error interceptors.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Stage the failure happened in.
    pub stage: PipelineStage,
    /// The outgoing request as far as it was prepared.
    pub request: Option<HttpRequest>,
}

impl ErrorContext {
    /// Creates a context for the given stage with no request.
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            stage,
            request: None,
        }
    }

    /// Attaches the request.
    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Returns true if the request was handed to the transport.
    pub fn was_sent(&self) -> bool {
        self.stage != PipelineStage::Request && self.request.is_some()
    }
}

/// Runs request interceptors in order, threading the request through.
pub async fn execute_request_interceptors(
    interceptors: &[Arc<dyn RequestInterceptor>],
    mut request: HttpRequest,
) -> HttpResult<HttpRequest> {
    for (index, interceptor) in interceptors.iter().enumerate() {
        request = interceptor.on_request(request).await?;
        tracing::trace!(index, "request interceptor applied");
    }
    Ok(request)
}

/// Runs response interceptors in order, threading the response through.
pub async fn execute_response_interceptors(
    interceptors: &[Arc<dyn ResponseInterceptor>],
    mut response: HttpResponse,
) -> HttpResult<HttpResponse> {
    for (index, interceptor) in interceptors.iter().enumerate() {
        response = interceptor.on_response(response).await?;
        tracing::trace!(index, "response interceptor applied");
    }
    Ok(response)
}

/// Runs error interceptors in order.
///
/// The first interceptor that returns `Ok` settles the chain. Each `Err`
/// becomes the error seen by the next interceptor; the last one reaches the
/// caller. With no interceptors the error is returned unchanged.
pub async fn execute_error_interceptors(
    interceptors: &[Arc<dyn ErrorInterceptor>],
    error: HttpClientError,
    ctx: &ErrorContext,
) -> HttpResult<HttpResponse> {
    let mut current = error;
    for (index, interceptor) in interceptors.iter().enumerate() {
        match interceptor.on_error(current, ctx).await {
            Ok(response) => {
                tracing::debug!(index, status = response.status, "error interceptor recovered");
                return Ok(response);
            }
            Err(next) => current = next,
        }
    }
    Err(current)
}

/// Adapts a closure into an interceptor.
///
/// The same wrapper serves all three chains; the closure's signature
/// decides which trait applies:
///
/// - `Fn(HttpRequest) -> impl Future<Output = HttpResult<HttpRequest>>`
/// - `Fn(HttpResponse) -> impl Future<Output = HttpResult<HttpResponse>>`
/// - `Fn(HttpClientError) -> impl Future<Output = HttpResult<HttpResponse>>`
pub struct InterceptorFn<F>(F);

/// Wraps a closure as an interceptor. See [`InterceptorFn`].
pub fn interceptor_fn<F>(f: F) -> InterceptorFn<F> {
    InterceptorFn(f)
}

#[async_trait]
impl<F, Fut> RequestInterceptor for InterceptorFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResult<HttpRequest>> + Send + 'static,
{
    async fn on_request(&self, request: HttpRequest) -> HttpResult<HttpRequest> {
        (self.0)(request).await
    }
}

#[async_trait]
impl<F, Fut> ResponseInterceptor for InterceptorFn<F>
where
    F: Fn(HttpResponse) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResult<HttpResponse>> + Send + 'static,
{
    async fn on_response(&self, response: HttpResponse) -> HttpResult<HttpResponse> {
        (self.0)(response).await
    }
}

#[async_trait]
impl<F, Fut> ErrorInterceptor for InterceptorFn<F>
where
    F: Fn(HttpClientError) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResult<HttpResponse>> + Send + 'static,
{
    async fn on_error(
        &self,
        error: HttpClientError,
        _ctx: &ErrorContext,
    ) -> HttpResult<HttpResponse> {
        (self.0)(error).await
    }
}

impl<F> std::fmt::Debug for InterceptorFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorFn").finish_non_exhaustive()
    }
}

/// Adds an `X-Request-Id` header (UUID v4) unless one is already present.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdInterceptor;

#[async_trait]
impl RequestInterceptor for RequestIdInterceptor {
    async fn on_request(&self, mut request: HttpRequest) -> HttpResult<HttpRequest> {
        if request.header(REQUEST_ID_HEADER).is_none() {
            request.headers.insert(
                REQUEST_ID_HEADER.to_string(),
                uuid::Uuid::new_v4().to_string(),
            );
        }
        Ok(request)
    }
}
