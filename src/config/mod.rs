//! Configuration for the HTTP client and the i18n loader.
//!
//! [`HttpClientConfig`] is used both for the process-wide defaults held by
//! the client and for per-call options; the two are combined by
//! [`crate::client::merge_config_and_headers`].

use bytes::Bytes;
use http::Method;
use std::time::Duration;
use url::Url;

use crate::errors::{ConfigError, ConfigResult};
use crate::transport::Headers;

/// Default `Content-Type` applied by [`create_default_config`].
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default language used when a requested language has no bundle.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Environment variable holding the default base URL.
pub const ENV_BASE_URL: &str = "APP_HTTP_BASE_URL";
/// Environment variable holding the default timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "APP_HTTP_TIMEOUT_MS";
/// Environment variable holding extra default headers (`name=value;name=value`).
pub const ENV_HEADERS: &str = "APP_HTTP_HEADERS";
/// Environment variable holding the default language.
pub const ENV_DEFAULT_LANGUAGE: &str = "APP_I18N_DEFAULT_LANGUAGE";
/// Environment variable that, when truthy, keeps failed loads cached.
pub const ENV_RETAIN_FAILURES: &str = "APP_I18N_RETAIN_FAILURES";

const SENSITIVE_HEADERS: [&str; 4] = ["authorization", "cookie", "x-api-key", "proxy-authorization"];

/// Per-request (or default) HTTP options.
///
/// Every field is optional so that call-site values can override defaults
/// field by field. Header names keep their original case.
#[derive(Clone, Default, PartialEq)]
pub struct HttpClientConfig {
    /// Request headers.
    pub headers: Headers,
    /// Absolute prefix for relative URLs.
    pub base_url: Option<String>,
    /// Request timeout. `None` or zero disables the deadline.
    pub timeout: Option<Duration>,
    /// HTTP method; GET when unset.
    pub method: Option<Method>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Query parameters appended to the URL, in order.
    pub query: Vec<(String, String)>,
}

/// Creates the process-wide default configuration.
///
/// Only `Content-Type: application/json` is set.
pub fn create_default_config() -> HttpClientConfig {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
    HttpClientConfig {
        headers,
        ..Default::default()
    }
}

impl HttpClientConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration builder.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::new()
    }

    /// Creates the default configuration overlaid with environment values.
    ///
    /// # Environment Variables
    ///
    /// - `APP_HTTP_BASE_URL` (optional): default base URL
    /// - `APP_HTTP_TIMEOUT_MS` (optional): default timeout in milliseconds
    /// - `APP_HTTP_HEADERS` (optional): extra headers as `name=value;name=value`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut builder = HttpClientConfigBuilder::from_config(create_default_config());

        if let Some(base_url) = var(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }

        if let Some(timeout_str) = var(ENV_TIMEOUT_MS) {
            match timeout_str.trim().parse::<u64>() {
                Ok(ms) => builder = builder.timeout_ms(ms),
                Err(_) => tracing::warn!(
                    var = ENV_TIMEOUT_MS,
                    value = %timeout_str,
                    "Ignoring non-numeric timeout"
                ),
            }
        }

        if let Some(headers) = var(ENV_HEADERS) {
            for (name, value) in parse_header_list(&headers)? {
                builder = builder.header(name, value);
            }
        }

        builder.build()
    }

    /// Sets a header, returning the updated configuration.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the timeout, returning the updated configuration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the method, returning the updated configuration.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Appends a query parameter, returning the updated configuration.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Headers = self
            .headers
            .iter()
            .map(|(k, v)| {
                let redacted = SENSITIVE_HEADERS
                    .iter()
                    .any(|s| k.eq_ignore_ascii_case(s));
                let value = if redacted { "[REDACTED]".to_string() } else { v.clone() };
                (k.clone(), value)
            })
            .collect();

        f.debug_struct("HttpClientConfig")
            .field("headers", &headers)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("method", &self.method)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("query", &self.query)
            .finish()
    }
}

/// Builder for `HttpClientConfig`.
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
    json_error: Option<ConfigError>,
}

impl HttpClientConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded with an existing configuration.
    pub fn from_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            json_error: None,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout = Some(Duration::from_millis(ms));
        self
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.config.method = Some(method);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.query.push((name.into(), value.into()));
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.config.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.config.body = Some(Bytes::from(body)),
            Err(e) => self.json_error = Some(e.into()),
        }
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ConfigResult<HttpClientConfig> {
        if let Some(err) = self.json_error {
            return Err(err);
        }

        if let Some(base_url) = &self.config.base_url {
            validate_base_url(base_url)?;
        }

        Ok(self.config)
    }
}

/// Checks that a non-empty base URL is an absolute http(s) URL.
pub fn validate_base_url(base_url: &str) -> ConfigResult<()> {
    if base_url.is_empty() {
        return Ok(());
    }

    let parsed = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn parse_header_list(raw: &str) -> ConfigResult<Vec<(String, String)>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidEnv {
                var: ENV_HEADERS.to_string(),
                message: format!("expected name=value, got '{}'", pair),
            })?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// What the resource cache does with a load that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Drop the failed entry once it settles so the next access reloads.
    #[default]
    Evict,
    /// Keep the failed entry until the cache is cleared explicitly.
    Retain,
}

/// Configuration for the i18n resource loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I18nConfig {
    /// Language used when a requested language has no bundle.
    pub default_language: String,
    /// Failure caching policy.
    pub failure_policy: FailurePolicy,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl I18nConfig {
    /// Creates the default configuration overlaid with environment values.
    ///
    /// # Environment Variables
    ///
    /// - `APP_I18N_DEFAULT_LANGUAGE` (optional): fallback language code
    /// - `APP_I18N_RETAIN_FAILURES` (optional): `1`/`true` keeps failed loads cached
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(language) = var(ENV_DEFAULT_LANGUAGE) {
            let language = language.trim();
            if !language.is_empty() {
                config.default_language = language.to_string();
            }
        }

        if let Some(retain) = var(ENV_RETAIN_FAILURES) {
            if matches!(retain.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.failure_policy = FailurePolicy::Retain;
            }
        }

        config
    }

    /// Sets the default language.
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Sets the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
