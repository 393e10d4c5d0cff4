//! OAuth 2.1 resource server support.
//!
//! The gateway acts as a **resource server**: it validates tokens issued by
//! an external authorization server and serves Protected Resource Metadata
//! for discovery. It never issues tokens.
//!
//! # Architecture
//!
//! - **Bearer extraction** ([`bearer_token`]): pulls the credential out of the
//!   `Authorization` header. Absence is a normal outcome, never an error.
//!
//! - **Protected Resource Metadata** ([`ProtectedResourceMetadata`]): served at
//!   `/.well-known/oauth-protected-resource` so OAuth clients can discover
//!   which authorization server to use (RFC 9728).
//!
//! - **Token Validation** ([`TokenValidator`]): [`JwksValidator`] checks
//!   signature, issuer, audience and expiry against the authorization
//!   server's published keys; [`JwtValidator`] does the same with a static key.
//!
//! - **HTTP Middleware** ([`OAuthLayer`]/[`OAuthService`]): rejects requests
//!   without a valid token with a `WWW-Authenticate` challenge and attaches an
//!   [`AuthenticatedCaller`] to the ones that pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use webinar_mcp::{CallToolResult, HttpTransport, McpRouter, NoParams, ToolBuilder};
//! use webinar_mcp::oauth::{JwksValidator, OAuthLayer, ProtectedResourceMetadata};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), webinar_mcp::BoxError> {
//!     let tool = ToolBuilder::new("ping_downstream")
//!         .description("Says hello")
//!         .handler(|_: NoParams| async move { Ok(CallToolResult::text("hello")) })
//!         .build()?;
//!
//!     let router = McpRouter::new().tool(tool);
//!
//!     let metadata = ProtectedResourceMetadata::new("https://mcp.example.com/")
//!         .authorization_server("https://auth.example.com")
//!         .scope("openid");
//!
//!     let validator = JwksValidator::discover("https://auth.example.com")
//!         .await?
//!         .expected_audience("https://mcp.example.com/")
//!         .expected_issuer("https://auth.example.com")
//!         .build()
//!         .await?;
//!
//!     let app = HttpTransport::new(router)
//!         .metadata(metadata.clone())
//!         .into_router()
//!         .layer(OAuthLayer::new(validator, metadata).public_path("/health"));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:7071").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Discovery Flow
//!
//! 1. Client calls the MCP endpoint without a token
//! 2. Server returns `401` with `WWW-Authenticate: Bearer resource_metadata="..."`
//! 3. Client fetches `/.well-known/oauth-protected-resource` to discover the auth server
//! 4. Client obtains a token whose audience is this resource
//! 5. Client retries with `Authorization: Bearer <token>`

pub mod bearer;
pub mod error;
pub mod jwks;
pub mod metadata;
pub mod middleware;
pub mod token;

pub use bearer::{BearerToken, bearer_token};
pub use error::OAuthError;
pub use jwks::{JwksError, JwksValidator, JwksValidatorBuilder};
pub use metadata::ProtectedResourceMetadata;
pub use middleware::{AuthenticatedCaller, OAuthLayer, OAuthService};
pub use token::{JwtValidator, TokenAudience, TokenClaims, TokenValidator};
