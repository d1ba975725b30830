//! HTTP client pipeline.
//!
//! [`HttpClient`] owns the default configuration, the transport and three
//! ordered interceptor chains. Every call runs the same pipeline:
//!
//! 1. merge call-site options over the defaults;
//! 2. run the request interceptors;
//! 3. race the transport call against the request timeout;
//! 4. turn a non-2xx status into an [`HttpClientError::Status`];
//! 5. run the response interceptors.
//!
//! A failure at any step is classified and handed to the error
//! interceptors, which may recover with a substitute response.

mod error_handler;
mod interceptors;
mod merge;
mod timeout;
mod url;

pub use error_handler::handle_http_error;
pub use interceptors::{
    execute_error_interceptors, execute_request_interceptors, execute_response_interceptors,
    interceptor_fn, ErrorContext, ErrorInterceptor, InterceptorFn, PipelineStage,
    RequestIdInterceptor, RequestInterceptor, ResponseInterceptor, REQUEST_ID_HEADER,
};
pub use merge::{merge_config_and_headers, MergedConfig};
pub use timeout::{
    create_timeout_controller, send_with_timeout, AbortController, AbortSignal, TimeoutController,
};
pub use url::build_url;

use http::Method;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::auth::{BearerAuthInterceptor, TokenProvider};
use crate::config::{create_default_config, validate_base_url, HttpClientConfig};
use crate::errors::{
    ConfigError, ConfigResult, HttpClientError, HttpResult, RawHttpError, DECODE_ERROR_NAME,
    SERIALIZE_ERROR_NAME,
};
use crate::observability::{DefaultMetricsCollector, Logger, LoggingInterceptor, MetricsCollector};
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};

type RequestChain = Vec<Arc<dyn RequestInterceptor>>;
type ResponseChain = Vec<Arc<dyn ResponseInterceptor>>;
type ErrorChain = Vec<Arc<dyn ErrorInterceptor>>;

/// Number of interceptors registered on each chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterceptorCounts {
    /// Request interceptors.
    pub request: usize,
    /// Response interceptors.
    pub response: usize,
    /// Error interceptors.
    pub error: usize,
}

/// HTTP client with interceptor chains and per-request timeouts.
///
/// Construct one per process and share it by reference (or `Arc`).
///
/// # Example
///
/// ```rust,no_run
/// use app_shell_core::{HttpClient, HttpClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let defaults = HttpClientConfig::builder()
///         .base_url("https://api.example.com")
///         .timeout_ms(5_000)
///         .build()?;
///     let client = HttpClient::builder().config(defaults).build()?;
///
///     let orders: serde_json::Value = client.get("/orders").await?;
///     println!("{}", orders);
///     Ok(())
/// }
/// ```
pub struct HttpClient {
    default_config: HttpClientConfig,
    transport: Arc<dyn HttpTransport>,
    request_interceptors: RwLock<RequestChain>,
    response_interceptors: RwLock<ResponseChain>,
    error_interceptors: RwLock<ErrorChain>,
    auth_interceptor_attached: AtomicBool,
    metrics: Arc<dyn MetricsCollector>,
}

impl HttpClient {
    /// Creates a new client builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Creates a client whose defaults come from the environment.
    ///
    /// See [`HttpClientConfig::from_env`].
    pub fn from_env() -> ConfigResult<Self> {
        HttpClientBuilder::new()
            .config(HttpClientConfig::from_env()?)
            .build()
    }

    /// Creates a client over the given transport with the stock defaults.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self::from_parts(
            create_default_config(),
            transport,
            Arc::new(DefaultMetricsCollector::new()),
        )
    }

    fn from_parts(
        default_config: HttpClientConfig,
        transport: Arc<dyn HttpTransport>,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            default_config,
            transport,
            request_interceptors: RwLock::new(Vec::new()),
            response_interceptors: RwLock::new(Vec::new()),
            error_interceptors: RwLock::new(Vec::new()),
            auth_interceptor_attached: AtomicBool::new(false),
            metrics,
        }
    }

    /// Returns the defaults merged under every call.
    pub fn default_config(&self) -> &HttpClientConfig {
        &self.default_config
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    /// Appends a request interceptor.
    pub fn add_request_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) {
        self.request_interceptors.write().push(interceptor);
    }

    /// Appends a response interceptor.
    pub fn add_response_interceptor(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.response_interceptors.write().push(interceptor);
    }

    /// Appends an error interceptor.
    pub fn add_error_interceptor(&self, interceptor: Arc<dyn ErrorInterceptor>) {
        self.error_interceptors.write().push(interceptor);
    }

    /// Removes every interceptor and resets the auth attach guard.
    pub fn clear_interceptors(&self) {
        self.request_interceptors.write().clear();
        self.response_interceptors.write().clear();
        self.error_interceptors.write().clear();
        self.auth_interceptor_attached.store(false, Ordering::Release);
    }

    /// Returns how many interceptors each chain holds.
    pub fn interceptor_counts(&self) -> InterceptorCounts {
        InterceptorCounts {
            request: self.request_interceptors.read().len(),
            response: self.response_interceptors.read().len(),
            error: self.error_interceptors.read().len(),
        }
    }

    /// Attaches a [`BearerAuthInterceptor`] for `provider`, at most once.
    ///
    /// Returns `true` if this call attached it and `false` if one was
    /// already attached. Safe to call from code that re-runs on every
    /// render or session refresh.
    pub fn attach_auth_interceptor(&self, provider: Arc<dyn TokenProvider>) -> bool {
        if self
            .auth_interceptor_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.add_request_interceptor(Arc::new(BearerAuthInterceptor::new(provider)));
        tracing::debug!("auth interceptor attached");
        true
    }

    /// Returns true once an auth interceptor has been attached.
    pub fn is_auth_interceptor_attached(&self) -> bool {
        self.auth_interceptor_attached.load(Ordering::Acquire)
    }

    /// Runs the full pipeline and returns the (possibly recovered) response.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn request(&self, url: &str, config: HttpClientConfig) -> HttpResult<HttpResponse> {
        let start = Instant::now();

        // Registration during a call affects later calls only.
        let request_chain = self.request_interceptors.read().clone();
        let response_chain = self.response_interceptors.read().clone();

        let mut ctx = ErrorContext::new(PipelineStage::Request);
        let outcome = self
            .run_pipeline(url, &config, &request_chain, &response_chain, &mut ctx)
            .await;

        let result = match outcome {
            Ok(response) => Ok(response),
            Err(raw) => {
                if matches!(raw, RawHttpError::Aborted { .. }) {
                    self.metrics.record_timeout();
                }
                self.settle_error(raw, &ctx).await
            }
        };

        self.metrics.record_request(result.is_ok(), start.elapsed());
        result
    }

    async fn run_pipeline(
        &self,
        url: &str,
        config: &HttpClientConfig,
        request_chain: &[Arc<dyn RequestInterceptor>],
        response_chain: &[Arc<dyn ResponseInterceptor>],
        ctx: &mut ErrorContext,
    ) -> Result<HttpResponse, RawHttpError> {
        let request = merge_config_and_headers(url, config, &self.default_config).into_request();
        ctx.request = Some(request.clone());

        let request = execute_request_interceptors(request_chain, request).await?;
        ctx.stage = PipelineStage::Transport;
        ctx.request = Some(request.clone());

        let response = send_with_timeout(self.transport.as_ref(), request).await?;
        ctx.stage = PipelineStage::Response;

        if !response.is_success() {
            return Err(HttpClientError::from_response(&response).into());
        }

        Ok(execute_response_interceptors(response_chain, response).await?)
    }

    async fn settle_error(&self, error: RawHttpError, ctx: &ErrorContext) -> HttpResult<HttpResponse> {
        let error_chain = self.error_interceptors.read().clone();
        let settled = handle_http_error(error, ctx, &error_chain).await;
        match &settled {
            Ok(_) => self.metrics.record_recovery(),
            Err(err) => self.metrics.record_error(err.name()),
        }
        settled
    }

    /// Runs the pipeline and decodes the JSON body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` work
    /// for `204 No Content`. A decode failure is itself passed through the
    /// error interceptors; a recovered response is decoded instead. If the
    /// recovered response does not decode either, that second `DecodeError`
    /// is returned directly and the error chain does not run again.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        url: &str,
        config: HttpClientConfig,
    ) -> HttpResult<T> {
        let response = self.request(url, config).await?;
        match decode_body(&response) {
            Ok(value) => Ok(value),
            Err(err) => {
                let ctx = ErrorContext::new(PipelineStage::Response);
                let recovered = self.settle_error(err.into(), &ctx).await?;
                decode_body(&recovered)
                    .map_err(|e| HttpClientError::named(DECODE_ERROR_NAME, e.to_string()))
            }
        }
    }

    /// Sends a GET request and decodes the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> HttpResult<T> {
        self.request_json(url, HttpClientConfig::new().with_method(Method::GET))
            .await
    }

    /// Sends a POST request with a JSON body and decodes the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> HttpResult<T> {
        self.send_json(Method::POST, url, body).await
    }

    /// Sends a PUT request with a JSON body and decodes the JSON response.
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> HttpResult<T> {
        self.send_json(Method::PUT, url, body).await
    }

    /// Sends a PATCH request with a JSON body and decodes the JSON response.
    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> HttpResult<T> {
        self.send_json(Method::PATCH, url, body).await
    }

    /// Sends a DELETE request and decodes the JSON response.
    pub async fn delete<T: DeserializeOwned>(&self, url: &str) -> HttpResult<T> {
        self.request_json(url, HttpClientConfig::new().with_method(Method::DELETE))
            .await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> HttpResult<T> {
        let body = match serde_json::to_vec(body) {
            Ok(body) => body,
            Err(err) => {
                let ctx = ErrorContext::new(PipelineStage::Request);
                let recovered = self
                    .settle_error(RawHttpError::failed(SERIALIZE_ERROR_NAME, err), &ctx)
                    .await?;
                return decode_body(&recovered)
                    .map_err(|e| HttpClientError::named(DECODE_ERROR_NAME, e.to_string()));
            }
        };

        let config = HttpClientConfig {
            method: Some(method),
            body: Some(body.into()),
            ..HttpClientConfig::default()
        };
        self.request_json(url, config).await
    }
}

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, serde_json::Error> {
    if response.body.is_empty() {
        serde_json::from_slice(b"null")
    } else {
        response.json()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("default_config", &self.default_config)
            .field("interceptors", &self.interceptor_counts())
            .field("auth_interceptor_attached", &self.is_auth_interceptor_attached())
            .finish()
    }
}

/// Builder for [`HttpClient`].
#[derive(Default)]
pub struct HttpClientBuilder {
    config: Option<HttpClientConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    logger: Option<Arc<dyn Logger>>,
}

impl HttpClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default configuration. Defaults to [`create_default_config`].
    pub fn config(mut self, config: HttpClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a custom transport. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Registers a [`LoggingInterceptor`] for `logger` on all three chains.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the client.
    pub fn build(self) -> ConfigResult<HttpClient> {
        let config = self.config.unwrap_or_else(create_default_config);
        if let Some(base_url) = &config.base_url {
            validate_base_url(base_url)?;
        }

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(|e| ConfigError::Transport {
                message: e.to_string(),
            })?),
        };

        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        let client = HttpClient::from_parts(config, transport, metrics);

        if let Some(logger) = self.logger {
            let logging = Arc::new(LoggingInterceptor::new(logger));
            client.add_request_interceptor(logging.clone());
            client.add_response_interceptor(logging.clone());
            client.add_error_interceptor(logging);
        }

        Ok(client)
    }
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
