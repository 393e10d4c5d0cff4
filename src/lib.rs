//! # webinar-mcp
//!
//! An OAuth-protected Model Context Protocol server for the Latino .Net
//! Online community. It exposes the community's webinar API as MCP tools and
//! forwards each caller's bearer token to that API unchanged, so the gateway
//! never holds credentials of its own.
//!
//! MCP is served through Tower's `Service` trait: [`McpRouter`] dispatches
//! requests to tools, [`JsonRpcService`] adds JSON-RPC framing and
//! [`HttpTransport`] puts it all behind an axum router. Authentication is an
//! ordinary layer ([`oauth::OAuthLayer`]) in front of that router.
//!
//! ```text
//! POST / ──► OAuthLayer ──► HttpTransport ──► McpTracingLayer ──► McpRouter ──► Tool
//!              │                                                               │
//!              └─ 401 + WWW-Authenticate                WebinarGateway ◄──────┘
//!                                                            │
//!                                         LatinoNet webinar API (Bearer <token>)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use webinar_mcp::BoxError;
//! use webinar_mcp::app::build_app;
//! use webinar_mcp::config::{Cli, Settings};
//! use webinar_mcp::oauth::JwksValidator;
//! use webinar_mcp::webinar::HttpWebinarClient;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let settings = Settings::try_from(Cli::parse())?;
//!     let validator = JwksValidator::discover(&settings.auth_server_url)
//!         .await?
//!         .expected_audience(settings.audience())
//!         .expected_issuer(&settings.auth_server_url)
//!         .build()
//!         .await?;
//!     let client = HttpWebinarClient::new(
//!         settings.downstream_base_url.clone(),
//!         settings.downstream_timeout,
//!     )?;
//!
//!     let app = build_app(&settings, validator, client)?;
//!     let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Tools
//!
//! - `get_upcoming_webinars` - published webinars with their speakers
//! - `search_speakers` - speaker lookup by name, email or Twitter handle,
//!   registered only with `--enable-speaker-search`

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod jsonrpc;
pub mod oauth;
pub mod protocol;
pub mod router;
pub mod secret;
pub mod tool;
pub mod tracing_layer;
pub mod transport;
pub mod webinar;

// Re-exports
pub use context::{Extensions, RequestContext};
pub use error::{BoxError, Error, JsonRpcError, Result};
pub use jsonrpc::JsonRpcService;
pub use protocol::{
    CallToolResult, Content, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponseMessage, McpRequest, McpResponse, ToolAnnotations,
};
pub use router::{McpRouter, RouterRequest, RouterResponse};
pub use secret::SecretString;
pub use tool::{BoxToolService, NoParams, Tool, ToolBuilder, ToolRequest};
pub use tracing_layer::{McpTracingLayer, McpTracingService};
pub use transport::HttpTransport;
