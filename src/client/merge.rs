//! Combining call-site options with the client defaults.

use http::Method;

use super::url::build_url;
use crate::config::HttpClientConfig;
use crate::transport::{Headers, HttpRequest};

/// Result of [`merge_config_and_headers`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    /// Effective options: call-site fields override defaults.
    pub merged_config: HttpClientConfig,
    /// Effective headers: call-site headers override defaults per key.
    pub merged_headers: Headers,
    /// The URL joined onto the effective base URL.
    pub full_url: String,
}

impl MergedConfig {
    /// Turns the merged options into the outgoing request handed to the
    /// request interceptors.
    pub fn into_request(self) -> HttpRequest {
        let MergedConfig {
            merged_config,
            merged_headers,
            full_url,
        } = self;

        HttpRequest {
            method: merged_config.method.unwrap_or(Method::GET),
            url: full_url,
            headers: merged_headers,
            body: merged_config.body,
            query: merged_config.query,
            timeout: merged_config.timeout,
        }
    }
}

/// Merges per-call options over the defaults.
///
/// Header keys are compared exactly as given, so `x-a` and `X-A` are
/// distinct. The base URL comes from `config` when present, else from
/// `default_config`. Query parameters accumulate: the defaults come first,
/// followed by the call-site pairs.
pub fn merge_config_and_headers(
    url: &str,
    config: &HttpClientConfig,
    default_config: &HttpClientConfig,
) -> MergedConfig {
    let mut merged_headers = default_config.headers.clone();
    merged_headers.extend(
        config
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );

    let base_url = config
        .base_url
        .as_ref()
        .or(default_config.base_url.as_ref())
        .cloned();
    let full_url = build_url(url, base_url.as_deref());

    let merged_config = HttpClientConfig {
        headers: merged_headers.clone(),
        base_url,
        timeout: config.timeout.or(default_config.timeout),
        method: config
            .method
            .clone()
            .or_else(|| default_config.method.clone()),
        body: config.body.clone().or_else(|| default_config.body.clone()),
        query: default_config
            .query
            .iter()
            .chain(&config.query)
            .cloned()
            .collect(),
    };

    MergedConfig {
        merged_config,
        merged_headers,
        full_url,
    }
}
