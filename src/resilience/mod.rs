//! Resilience layer for the HTTP client.
//!
//! The pipeline never retries on its own. Retrying is opt-in: register a
//! [`RetryInterceptor`] on the error chain.

mod retry;

pub use retry::{RetryConfig, RetryInterceptor};
