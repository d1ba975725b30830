//! Authentication port and the bearer-token request interceptor.
//!
//! The application supplies a [`TokenProvider`]; the client attaches a
//! [`BearerAuthInterceptor`] for it once, through
//! [`HttpClient::attach_auth_interceptor`](crate::client::HttpClient::attach_auth_interceptor).

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::client::RequestInterceptor;
use crate::errors::HttpResult;
use crate::transport::HttpRequest;

/// Header written by [`BearerAuthInterceptor`].
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Source of the current access token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the token to send, or `None` when signed out.
    async fn access_token(&self) -> Option<SecretString>;
}

/// Token provider holding a token set by the application (sign-in/out).
#[derive(Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<SecretString>>,
}

impl StaticTokenProvider {
    /// Creates a provider with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::new(token.into()))),
        }
    }

    /// Replaces the token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(SecretString::new(token.into()));
    }

    /// Removes the token.
    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// Returns a hint of the token for debugging (last 4 characters).
    pub fn token_hint(&self) -> Option<String> {
        self.token.read().as_ref().map(|token| {
            let token = token.expose_secret();
            // Byte offset of the fourth character from the end.
            match token.char_indices().rev().nth(3) {
                Some((start, _)) if start > 0 => format!("...{}", &token[start..]),
                _ => "****".to_string(),
            }
        })
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<SecretString> {
        self.token.read().clone()
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .field("token_hint", &self.token_hint())
            .finish()
    }
}

/// Writes `Authorization: Bearer <token>` when the provider has a token.
///
/// Requests go out unauthenticated while the provider returns `None`.
pub struct BearerAuthInterceptor {
    provider: Arc<dyn TokenProvider>,
}

impl BearerAuthInterceptor {
    /// Creates an interceptor reading tokens from `provider`.
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuthInterceptor {
    async fn on_request(&self, mut request: HttpRequest) -> HttpResult<HttpRequest> {
        if let Some(token) = self.provider.access_token().await {
            request.headers.insert(
                AUTHORIZATION_HEADER.to_string(),
                format!("Bearer {}", token.expose_secret()),
            );
        }
        Ok(request)
    }
}

impl std::fmt::Debug for BearerAuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthInterceptor").finish_non_exhaustive()
    }
}
