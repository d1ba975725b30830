//! Retry policy implementation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{send_with_timeout, ErrorContext, ErrorInterceptor};
use crate::errors::{HttpClientError, HttpResult};
use crate::transport::{HttpResponse, HttpTransport};

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Delay multiplier for exponential backoff.
    pub multiplier: f64,
    /// Whether to add jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = mult;
        self
    }

    /// Sets whether to use jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);

        let delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        // 0-25% random variation
        let delay_ms = if self.jitter {
            let jitter = rand::random::<f64>() * 0.25;
            delay_ms * (1.0 + jitter)
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Error interceptor that re-issues failed requests with exponential
/// backoff.
///
/// Only errors that [`HttpClientError::is_retryable`] accepts are retried,
/// and only when the failed request actually reached the transport. The
/// re-issued request is the one the request interceptors produced, sent
/// with the same timeout. A successful retry settles the chain; its
/// response does not run through the response interceptors.
pub struct RetryInterceptor {
    transport: Arc<dyn HttpTransport>,
    config: RetryConfig,
}

impl RetryInterceptor {
    /// Creates a retry interceptor sending through `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>, config: RetryConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl ErrorInterceptor for RetryInterceptor {
    async fn on_error(
        &self,
        error: HttpClientError,
        ctx: &ErrorContext,
    ) -> HttpResult<HttpResponse> {
        if !error.is_retryable() || !ctx.was_sent() {
            return Err(error);
        }
        let Some(request) = ctx.request.as_ref() else {
            return Err(error);
        };

        let mut last_error = error;
        for attempt in 0..self.config.max_retries {
            let delay = self.config.delay_for(attempt);
            tracing::info!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Retrying after error"
            );
            tokio::time::sleep(delay).await;

            last_error = match send_with_timeout(self.transport.as_ref(), request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => HttpClientError::from_response(&response),
                Err(raw) => raw.classify(),
            };

            if !last_error.is_retryable() {
                break;
            }
        }

        Err(last_error)
    }
}

impl std::fmt::Debug for RetryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
