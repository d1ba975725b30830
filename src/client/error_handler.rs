//! Error normalization.

use std::sync::Arc;

use super::interceptors::{execute_error_interceptors, ErrorContext, ErrorInterceptor};
use crate::errors::{HttpResult, RawHttpError};
use crate::transport::HttpResponse;

/// Classifies a raw failure and runs it through the error interceptors.
///
/// Classification, in order:
/// 1. an abort (timeout) becomes `TimeoutError` / `"Request timeout"`;
/// 2. an error that already carries a status passes through unchanged;
/// 3. anything else becomes a generic error, non-error values stringified.
///
/// The interceptor chain's outcome is returned as-is, so an interceptor
/// that recovers turns the failure into `Ok`.
pub async fn handle_http_error(
    error: RawHttpError,
    ctx: &ErrorContext,
    error_interceptors: &[Arc<dyn ErrorInterceptor>],
) -> HttpResult<HttpResponse> {
    let classified = error.classify();
    tracing::debug!(
        name = classified.name(),
        status = ?classified.status_code(),
        stage = ?ctx.stage,
        "handling http error"
    );
    execute_error_interceptors(error_interceptors, classified, ctx).await
}
