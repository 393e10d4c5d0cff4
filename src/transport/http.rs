//! Stateless HTTP transport for MCP
//!
//! Every POST carries one JSON-RPC message (single or batch) and gets its
//! answer in the response body. There are no sessions and no server-sent
//! events; each request is handled on its own.
//!
//! Routes:
//! - `POST /` - MCP JSON-RPC endpoint
//! - `GET /health` - liveness probe
//! - `GET /.well-known/oauth-protected-resource` - RFC 9728 metadata, when configured
//!
//! The transport does no authentication itself. Wrap [`HttpTransport::into_router`]
//! in an [`OAuthLayer`](crate::oauth::OAuthLayer); the [`AuthenticatedCaller`] it
//! attaches is handed on to tool handlers.
//!
//! # Example
//!
//! ```rust,no_run
//! use webinar_mcp::{CallToolResult, HttpTransport, McpRouter, NoParams, ToolBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tool = ToolBuilder::new("hello")
//!         .handler(|_: NoParams| async move { Ok(CallToolResult::text("hi")) })
//!         .build()?;
//!
//!     let app = HttpTransport::new(McpRouter::new().tool(tool)).into_router();
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:7071").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tower::Layer;

use crate::context::Extensions;
use crate::error::JsonRpcError;
use crate::jsonrpc::JsonRpcService;
use crate::oauth::{AuthenticatedCaller, ProtectedResourceMetadata};
use crate::protocol::{JsonRpcMessage, JsonRpcNotification, JsonRpcResponse, McpNotification};
use crate::router::McpRouter;
use crate::tracing_layer::McpTracingLayer;

/// Largest request body accepted on the MCP endpoint.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const HEALTH_PATH: &str = "/health";

struct AppState {
    router: McpRouter,
    metadata: Option<ProtectedResourceMetadata>,
}

/// HTTP transport for MCP servers
///
/// ```rust
/// use webinar_mcp::{HttpTransport, McpRouter};
/// use webinar_mcp::oauth::ProtectedResourceMetadata;
///
/// let app = HttpTransport::new(McpRouter::new())
///     .metadata(ProtectedResourceMetadata::new("https://mcp.example.com/"))
///     .into_router();
/// ```
pub struct HttpTransport {
    router: McpRouter,
    metadata: Option<ProtectedResourceMetadata>,
}

impl HttpTransport {
    pub fn new(router: McpRouter) -> Self {
        Self {
            router,
            metadata: None,
        }
    }

    /// Serve this document at `/.well-known/oauth-protected-resource`.
    pub fn metadata(mut self, metadata: ProtectedResourceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the axum router for this transport
    pub fn into_router(self) -> Router {
        let state = Arc::new(AppState {
            router: self.router,
            metadata: self.metadata,
        });

        let mut app = Router::new()
            .route("/", post(handle_post))
            .route(HEALTH_PATH, get(handle_health));

        if state.metadata.is_some() {
            app = app.route(
                ProtectedResourceMetadata::well_known_path(),
                get(handle_metadata),
            );
        }

        app.with_state(state)
    }
}

/// Handle POST requests carrying JSON-RPC messages
async fn handle_post(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let parsed: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            return json_rpc_error_response(JsonRpcError::parse_error(format!(
                "Invalid JSON: {}",
                e
            )));
        }
    };

    // Notifications have no id and get no response body
    let parsed = match parsed {
        Value::Array(items) => {
            let (requests, notifications): (Vec<Value>, Vec<Value>) =
                items.into_iter().partition(has_id);
            for notification in notifications {
                dispatch_notification(&state.router, notification);
            }
            if requests.is_empty() {
                return StatusCode::ACCEPTED.into_response();
            }
            Value::Array(requests)
        }
        single if !has_id(&single) => {
            dispatch_notification(&state.router, single);
            return StatusCode::ACCEPTED.into_response();
        }
        single => single,
    };

    let message: JsonRpcMessage = match serde_json::from_value(parsed) {
        Ok(m) => m,
        Err(e) => {
            return json_rpc_error_response(JsonRpcError::invalid_request(format!(
                "Invalid request: {}",
                e
            )));
        }
    };

    let mut extensions = Extensions::new();
    if let Some(caller) = parts.extensions.get::<AuthenticatedCaller>() {
        extensions.insert(caller.clone());
    }

    let mut service = JsonRpcService::new(McpTracingLayer::new().layer(state.router.clone()));
    let response = service.call_message(message, extensions).await;
    Json(response).into_response()
}

fn has_id(value: &Value) -> bool {
    value.get("id").is_some()
}

fn dispatch_notification(router: &McpRouter, value: Value) {
    match serde_json::from_value::<JsonRpcNotification>(value)
        .map_err(crate::Error::from)
        .and_then(|n| McpNotification::from_jsonrpc(&n))
    {
        Ok(notification) => router.handle_notification(notification),
        Err(e) => tracing::debug!(error = %e, "ignoring malformed notification"),
    }
}

async fn handle_health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn handle_metadata(State(state): State<Arc<AppState>>) -> Response {
    match &state.metadata {
        Some(metadata) => Json(metadata.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create a JSON-RPC error response with a null id
fn json_rpc_error_response(error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::error(None, error)).into_response()
}
