//! Application Shell Core
//!
//! Infrastructure for an application shell: an HTTP client with ordered
//! interceptor chains and per-request timeouts, and a lazy translation
//! loader with a coalescing resource cache.
//!
//! # Features
//!
//! - **Interceptors**: request, response and error chains run in
//!   registration order; error interceptors can recover with a response
//! - **Timeouts**: each call races the transport against an abort signal
//! - **Normalized errors**: every failure reaches the caller as an
//!   [`HttpClientError`] with a `name`, a `message` and an optional status
//! - **Auth**: attach-once bearer token injection from a [`auth::TokenProvider`]
//! - **Translations**: per-domain loaders, request coalescing, replace /
//!   shallow / deep merge into the runtime
//! - **Observability**: tracing, a logger port and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use app_shell_core::auth::StaticTokenProvider;
//! use app_shell_core::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     app_shell_core::observability::init_tracing(Default::default())?;
//!
//!     let client = HttpClient::builder()
//!         .config(HttpClientConfig::from_env()?)
//!         .build()?;
//!     client.attach_auth_interceptor(Arc::new(StaticTokenProvider::with_token("T")));
//!
//!     let orders: serde_json::Value = client.get("/orders").await?;
//!     println!("{}", orders);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod i18n;
pub mod observability;
pub mod resilience;
pub mod transport;

// Re-exports for convenience
pub use client::{
    build_url, create_timeout_controller, handle_http_error, merge_config_and_headers,
    ErrorContext, ErrorInterceptor, HttpClient, HttpClientBuilder, RequestInterceptor,
    ResponseInterceptor,
};
pub use config::{create_default_config, FailurePolicy, HttpClientConfig, I18nConfig};
pub use errors::{
    ConfigError, ConfigResult, HttpClientError, HttpResult, I18nError, I18nResult, RawHttpError,
};
pub use i18n::{
    add_resource, AddResourceRequest, CacheKey, I18nRuntime, LoadAndAddRequest, ResourceCache,
    ResourceLoadRequest, ResourceLoader, ResourceManager, TranslationResource, TranslationStore,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
