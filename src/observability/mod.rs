//! Observability: tracing setup, the logger port, metrics, and a logging
//! interceptor for the HTTP pipeline.

mod logging;
mod metrics;

pub use logging::{redact, ConsoleLogger, LogConfig, LogLevel, Logger, NoopLogger, TracingLogger};
pub use metrics::{DefaultMetricsCollector, MetricsCollector, PipelineMetrics};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::client::{
    ErrorContext, ErrorInterceptor, RequestInterceptor, ResponseInterceptor,
};
use crate::errors::{ConfigError, ConfigResult, HttpClientError, HttpResult};
use crate::transport::{HttpRequest, HttpResponse};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,app_shell_core=debug";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> ConfigResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| ConfigError::Logging {
        message: e.to_string(),
    })
}

/// Logs every request, response and error passing through the pipeline.
///
/// Register it on all three chains. As an error interceptor it always
/// passes the error on unchanged.
pub struct LoggingInterceptor {
    logger: Arc<dyn Logger>,
}

impl LoggingInterceptor {
    /// Creates an interceptor writing to `logger`.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl std::fmt::Debug for LoggingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingInterceptor").finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request(&self, request: HttpRequest) -> HttpResult<HttpRequest> {
        let mut ctx = HashMap::new();
        ctx.insert("method".to_string(), request.method.to_string());
        ctx.insert("url".to_string(), request.url.clone());
        self.logger
            .log(LogLevel::Debug, "Starting request", Some(&ctx));
        Ok(request)
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn on_response(&self, response: HttpResponse) -> HttpResult<HttpResponse> {
        let mut ctx = HashMap::new();
        ctx.insert("status".to_string(), response.status.to_string());
        ctx.insert("bytes".to_string(), response.body.len().to_string());
        self.logger
            .log(LogLevel::Debug, "Request completed", Some(&ctx));
        Ok(response)
    }
}

#[async_trait]
impl ErrorInterceptor for LoggingInterceptor {
    async fn on_error(
        &self,
        error: HttpClientError,
        ctx: &ErrorContext,
    ) -> HttpResult<HttpResponse> {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), error.name().to_string());
        fields.insert("stage".to_string(), format!("{:?}", ctx.stage));
        if let Some(request) = &ctx.request {
            fields.insert("url".to_string(), request.url.clone());
        }
        self.logger
            .log(LogLevel::Warn, &format!("Request failed: {}", error), Some(&fields));
        Err(error)
    }
}
