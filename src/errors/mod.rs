//! Error types for the HTTP pipeline and the i18n resource loader.
//!
//! The HTTP side distinguishes between the *raw* failure that enters the
//! error pipeline ([`RawHttpError`]) and the normalized error that leaves it
//! ([`HttpClientError`]). Classification happens exactly once, in
//! [`crate::client::handle_http_error`].

use std::time::Duration;
use thiserror::Error;

use crate::transport::{HttpResponse, TransportError};

/// Result type alias for HTTP pipeline operations.
pub type HttpResult<T> = Result<T, HttpClientError>;

/// Result type alias for i18n operations.
pub type I18nResult<T> = Result<T, I18nError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name carried by errors produced when a request exceeds its timeout.
pub const TIMEOUT_ERROR_NAME: &str = "TimeoutError";

/// Message carried by errors produced when a request exceeds its timeout.
pub const TIMEOUT_ERROR_MESSAGE: &str = "Request timeout";

/// Name carried by errors produced from non-2xx responses.
pub const HTTP_ERROR_NAME: &str = "HttpError";

/// Name used for generic errors with no more specific identity.
pub const GENERIC_ERROR_NAME: &str = "Error";

/// Name carried by errors raised while decoding a response body.
pub const DECODE_ERROR_NAME: &str = "DecodeError";

/// Name carried by errors raised while encoding a request body.
pub const SERIALIZE_ERROR_NAME: &str = "SerializeError";

/// Normalized error produced by the HTTP pipeline.
///
/// Every variant exposes a `name`, a `message` and, for HTTP-level failures,
/// a `status`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpClientError {
    /// The per-request timeout elapsed and the in-flight call was aborted.
    #[error("{message}")]
    Timeout {
        /// Error message, `"Request timeout"` when produced by the pipeline.
        message: String,
        /// The timeout that elapsed, when known.
        timeout: Option<Duration>,
    },

    /// The call completed with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message (server-provided when available).
        message: String,
        /// Raw response body.
        body: Option<String>,
    },

    /// Any other failure (transport, decoding, interceptor-raised, ...).
    #[error("{name}: {message}")]
    Generic {
        /// Identity of the underlying error.
        name: String,
        /// Error message.
        message: String,
    },
}

impl HttpClientError {
    /// Creates the error produced when a request times out.
    pub fn timeout(timeout: Option<Duration>) -> Self {
        HttpClientError::Timeout {
            message: TIMEOUT_ERROR_MESSAGE.to_string(),
            timeout,
        }
    }

    /// Creates an HTTP status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        HttpClientError::Status {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Creates a generic error named `"Error"`.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::named(GENERIC_ERROR_NAME, message)
    }

    /// Creates a generic error with an explicit name.
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        HttpClientError::Generic {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Builds a status error from a non-success response.
    ///
    /// The message is taken from a JSON `message` or `error` field when the
    /// body carries one, otherwise from the canonical reason phrase.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body = response.text();
        let server_message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .or_else(|| value.get("error"))
                    .and_then(|m| m.as_str().map(str::to_owned))
            });

        let message = server_message.unwrap_or_else(|| {
            http::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        });

        HttpClientError::Status {
            status: response.status,
            message,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }

    /// Returns the error's name discriminant.
    pub fn name(&self) -> &str {
        match self {
            HttpClientError::Timeout { .. } => TIMEOUT_ERROR_NAME,
            HttpClientError::Status { .. } => HTTP_ERROR_NAME,
            HttpClientError::Generic { name, .. } => name,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        match self {
            HttpClientError::Timeout { message, .. }
            | HttpClientError::Status { message, .. }
            | HttpClientError::Generic { message, .. } => message,
        }
    }

    /// Returns the HTTP status code, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for timeout errors.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpClientError::Timeout { .. })
    }

    /// Returns true if re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpClientError::Timeout { .. } => true,
            HttpClientError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            HttpClientError::Generic { name, .. } => name == TransportError::CONNECTION,
        }
    }
}

/// An unclassified failure entering the error pipeline.
#[derive(Debug)]
pub enum RawHttpError {
    /// The cancellation signal fired (timeout).
    Aborted {
        /// The timeout that triggered the abort, when known.
        timeout: Option<Duration>,
    },
    /// An already-classified error (status errors, interceptor-raised errors).
    Http(HttpClientError),
    /// An error value from a lower layer.
    Failed {
        /// Identity of the error.
        name: String,
        /// The underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A non-error value that was raised as a failure.
    Thrown(String),
}

impl RawHttpError {
    /// Wraps any displayable value, coercing it to its string form.
    pub fn thrown(value: impl std::fmt::Display) -> Self {
        RawHttpError::Thrown(value.to_string())
    }

    /// Wraps an error value under the given name.
    pub fn failed(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RawHttpError::Failed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Classifies the failure into a normalized [`HttpClientError`].
    ///
    /// Aborts become `TimeoutError`; already-classified errors pass through
    /// unchanged; everything else is wrapped as a generic error.
    pub fn classify(self) -> HttpClientError {
        match self {
            RawHttpError::Aborted { timeout } => HttpClientError::timeout(timeout),
            RawHttpError::Http(error) => error,
            RawHttpError::Failed { name, source } => HttpClientError::Generic {
                name,
                message: source.to_string(),
            },
            RawHttpError::Thrown(message) => HttpClientError::generic(message),
        }
    }
}

impl From<HttpClientError> for RawHttpError {
    fn from(err: HttpClientError) -> Self {
        RawHttpError::Http(err)
    }
}

impl From<TransportError> for RawHttpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Aborted => RawHttpError::Aborted { timeout: None },
            TransportError::Timeout { timeout } => RawHttpError::Aborted { timeout },
            other => RawHttpError::Failed {
                name: other.name().to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl From<serde_json::Error> for RawHttpError {
    fn from(err: serde_json::Error) -> Self {
        RawHttpError::failed(DECODE_ERROR_NAME, err)
    }
}

/// Error type for the i18n resource loader.
///
/// `Clone` so that one failed in-flight load can be handed to every caller
/// that was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum I18nError {
    /// No bundle exists for the namespace in the language or its fallbacks.
    #[error("No translation resource for namespace '{namespace}' in language '{language}'")]
    NotFound {
        /// Requested namespace.
        namespace: String,
        /// Requested language.
        language: String,
    },

    /// No loader is registered for the namespace.
    #[error("No resource loader registered for namespace '{namespace}'")]
    NoLoader {
        /// Requested namespace.
        namespace: String,
    },

    /// The loader failed.
    #[error("Failed to load '{namespace}' for '{language}': {message}")]
    Load {
        /// Requested namespace.
        namespace: String,
        /// Requested language.
        language: String,
        /// Failure description.
        message: String,
    },

    /// The resource was not a JSON object.
    #[error("Invalid translation resource: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },

    /// Reading a resource file failed.
    #[error("I/O error reading '{path}': {message}")]
    Io {
        /// File path.
        path: String,
        /// I/O error message.
        message: String,
    },

    /// A namespace or language identifier is not usable.
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl I18nError {
    /// Creates a load error.
    pub fn load(
        namespace: impl Into<String>,
        language: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        I18nError::Load {
            namespace: namespace.into(),
            language: language.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(namespace: impl Into<String>, language: impl Into<String>) -> Self {
        I18nError::NotFound {
            namespace: namespace.into(),
            language: language.into(),
        }
    }
}

impl From<serde_json::Error> for I18nError {
    fn from(err: serde_json::Error) -> Self {
        I18nError::Parse {
            message: err.to_string(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {var}: {message}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Why it was rejected.
        message: String,
    },

    /// The request body could not be serialized.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Serializer message.
        message: String,
    },

    /// The HTTP transport could not be constructed.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {message}")]
    Logging {
        /// Error message.
        message: String,
    },
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidBaseUrl {
            url: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_timeout_error_shape() {
        let error = HttpClientError::timeout(Some(Duration::from_millis(50)));
        assert_eq!(error.name(), "TimeoutError");
        assert_eq!(error.message(), "Request timeout");
        assert_eq!(error.status_code(), None);
        assert!(error.is_timeout());
    }

    #[test]
    fn test_classify_aborted() {
        let error = RawHttpError::Aborted { timeout: None }.classify();
        assert_eq!(error.name(), TIMEOUT_ERROR_NAME);
        assert_eq!(error.message(), TIMEOUT_ERROR_MESSAGE);
    }

    #[test]
    fn test_classify_status_passes_through() {
        let original = HttpClientError::Status {
            status: 404,
            message: "Not Found".to_string(),
            body: Some("{}".to_string()),
        };
        let classified = RawHttpError::Http(original.clone()).classify();
        assert_eq!(classified, original);
    }

    #[test]
    fn test_classify_thrown_string() {
        let error = RawHttpError::thrown("boom").classify();
        assert_eq!(error.name(), "Error");
        assert_eq!(error.message(), "boom");
    }

    #[test]
    fn test_classify_transport_failure() {
        let raw: RawHttpError = TransportError::Connection {
            message: "refused".to_string(),
        }
        .into();
        let error = raw.classify();
        assert_eq!(error.name(), TransportError::CONNECTION);
        assert!(error.message().contains("refused"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_transport_timeout_is_abort_flavored() {
        let raw: RawHttpError = TransportError::Timeout {
            timeout: Some(Duration::from_secs(1)),
        }
        .into();
        assert!(raw.classify().is_timeout());
    }

    #[test]
    fn test_transport_timeout_without_duration_reports_none() {
        let raw: RawHttpError = TransportError::Timeout { timeout: None }.into();
        assert!(matches!(
            raw.classify(),
            HttpClientError::Timeout { timeout: None, .. }
        ));
    }

    #[test]
    fn test_from_response_uses_server_message() {
        let error = HttpClientError::from_response(&response(422, r#"{"message":"bad input"}"#));
        assert_eq!(error.status_code(), Some(422));
        assert_eq!(error.message(), "bad input");
    }

    #[test]
    fn test_from_response_falls_back_to_reason() {
        let error = HttpClientError::from_response(&response(404, ""));
        assert_eq!(error.message(), "Not Found");
        assert!(matches!(error, HttpClientError::Status { body: None, .. }));
    }

    #[test]
    fn test_is_retryable() {
        assert!(HttpClientError::status(503, "down").is_retryable());
        assert!(HttpClientError::status(429, "slow down").is_retryable());
        assert!(!HttpClientError::status(404, "missing").is_retryable());
        assert!(!HttpClientError::generic("boom").is_retryable());
    }
}
