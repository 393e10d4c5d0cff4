//! OAuth 2.1 tower middleware for HTTP-level token validation.
//!
//! Provides [`OAuthLayer`] and [`OAuthService`], which gate every
//! non-public request on a valid bearer token and answer everything else
//! with a challenge pointing at the protected resource metadata.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tower::Layer;

use super::bearer::{BearerToken, bearer_token};
use super::error::OAuthError;
use super::metadata::ProtectedResourceMetadata;
use super::token::{TokenClaims, TokenValidator};
use crate::error::JsonRpcError;
use crate::protocol::JsonRpcResponse;

/// A caller that passed the authentication gate.
///
/// Inserted into the HTTP request extensions by [`OAuthService`] and handed
/// on to tool handlers for the lifetime of one request. The token is the
/// exact credential the caller presented.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub token: BearerToken,
    pub claims: TokenClaims,
}

/// Tower layer that wraps services with OAuth 2.1 bearer token validation.
///
/// # Example
///
/// ```rust
/// use webinar_mcp::oauth::{JwtValidator, OAuthLayer, ProtectedResourceMetadata};
///
/// let validator = JwtValidator::from_secret(b"my-secret");
/// let metadata = ProtectedResourceMetadata::new("https://mcp.example.com/")
///     .authorization_server("https://auth.example.com");
///
/// let layer = OAuthLayer::new(validator, metadata).public_path("/health");
/// ```
#[derive(Clone)]
pub struct OAuthLayer<V: TokenValidator> {
    validator: V,
    metadata: ProtectedResourceMetadata,
    public_paths: Vec<String>,
}

impl<V: TokenValidator> OAuthLayer<V> {
    pub fn new(validator: V, metadata: ProtectedResourceMetadata) -> Self {
        Self {
            validator,
            metadata,
            public_paths: vec![ProtectedResourceMetadata::well_known_path().to_string()],
        }
    }

    /// Add a path that does not require authentication.
    ///
    /// The `/.well-known/oauth-protected-resource` path is always public.
    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(path.into());
        self
    }
}

impl<S, V: TokenValidator> Layer<S> for OAuthLayer<V> {
    type Service = OAuthService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        OAuthService {
            inner,
            validator: self.validator.clone(),
            metadata: self.metadata.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

/// Tower service that validates OAuth 2.1 bearer tokens on HTTP requests.
///
/// Created by [`OAuthLayer`]. For each incoming request:
///
/// 1. Public paths pass through untouched
/// 2. The bearer token is extracted from the `Authorization` header
/// 3. The token is validated via [`TokenValidator`]
/// 4. On success, an [`AuthenticatedCaller`] is added to the request extensions
/// 5. On failure, a 401 with a `WWW-Authenticate` challenge is returned
#[derive(Clone)]
pub struct OAuthService<S, V: TokenValidator> {
    inner: S,
    validator: V,
    metadata: ProtectedResourceMetadata,
    public_paths: Vec<String>,
}

impl<S, V> tower_service::Service<Request<Body>> for OAuthService<S, V>
where
    S: tower_service::Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<crate::BoxError> + Send,
    V: TokenValidator,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let path = req.uri().path().to_string();
        let is_public = self.public_paths.iter().any(|p| path == *p)
            // The metadata document may be nested under a mount point
            || path.ends_with(ProtectedResourceMetadata::well_known_path());

        // Swap in the clone so the readied service handles this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if is_public {
            return Box::pin(async move { inner.call(req).await });
        }

        let validator = self.validator.clone();
        let metadata_url = self.metadata.metadata_url();

        Box::pin(async move {
            let Some(token) = bearer_token(req.headers()) else {
                tracing::debug!(path = %path, "challenging client without bearer token");
                return Ok(oauth_error_response(&OAuthError::MissingToken, &metadata_url));
            };

            let claims = match validator.validate_token(token.expose()).await {
                Ok(claims) => claims,
                Err(error) => {
                    tracing::warn!(path = %path, error = %error, "authentication failed");
                    return Ok(oauth_error_response(&error, &metadata_url));
                }
            };

            tracing::info!(
                sub = claims.sub.as_deref().unwrap_or("-"),
                name = claims.name.as_deref().unwrap_or("-"),
                "token validated"
            );

            req.extensions_mut()
                .insert(AuthenticatedCaller { token, claims });
            inner.call(req).await
        })
    }
}

/// Build the 401 challenge for an OAuth error.
///
/// The body is a JSON-RPC error so MCP clients can surface it, and the
/// `WWW-Authenticate` header points at the resource metadata document.
fn oauth_error_response(error: &OAuthError, metadata_url: &str) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);

    let body = JsonRpcResponse::error(None, JsonRpcError::unauthorized(error.to_string()));

    let challenge = HeaderValue::from_str(&error.www_authenticate(Some(metadata_url)))
        .unwrap_or_else(|_| HeaderValue::from_static("Bearer"));

    let mut response = (status, axum::Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, challenge);
    response
}
