//! HTTP transport layer.
//!
//! Provides the network primitive the pipeline drives: a transport trait,
//! request/response representations, and a reqwest-backed implementation.

mod http_transport;

pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

use std::collections::HashMap;
use std::time::Duration;

/// Header map. Keys are kept exactly as provided; no case normalization.
pub type Headers = HashMap<String, String>;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call was cancelled through its abort signal.
    #[error("Request aborted")]
    Aborted,

    /// The underlying client gave up waiting.
    #[error("Request timed out")]
    Timeout {
        /// Timeout duration, when the client reports it.
        timeout: Option<Duration>,
    },

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The request could not be constructed (bad URL, bad header, ...).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Name of connection failures.
    pub const CONNECTION: &'static str = "ConnectionError";
    /// Name of request construction failures.
    pub const INVALID_REQUEST: &'static str = "InvalidRequestError";
    /// Name of response read failures.
    pub const INVALID_RESPONSE: &'static str = "InvalidResponseError";

    /// Returns the error's name discriminant.
    pub fn name(&self) -> &'static str {
        match self {
            TransportError::Aborted => "AbortError",
            TransportError::Timeout { .. } => crate::errors::TIMEOUT_ERROR_NAME,
            TransportError::Connection { .. } => Self::CONNECTION,
            TransportError::InvalidRequest { .. } => Self::INVALID_REQUEST,
            TransportError::InvalidResponse { .. } => Self::INVALID_RESPONSE,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { timeout: None }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_builder() {
            TransportError::InvalidRequest {
                message: err.to_string(),
            }
        } else {
            TransportError::InvalidResponse {
                message: err.to_string(),
            }
        }
    }
}
