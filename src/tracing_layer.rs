//! MCP request tracing middleware.
//!
//! [`McpTracingLayer`] wraps a `Service<RouterRequest>` (normally the
//! [`McpRouter`](crate::McpRouter)) and records one span per request with the
//! method, request id, tool name and whether a caller was authenticated.
//! Completion is logged with the duration; JSON-RPC errors and tool results
//! flagged `isError` are logged at `WARN`.
//!
//! ```rust
//! use tower::Layer;
//! use webinar_mcp::{JsonRpcService, McpRouter, McpTracingLayer};
//!
//! let service = JsonRpcService::new(McpTracingLayer::new().layer(McpRouter::new()));
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::Layer;
use tower_service::Service;
use tracing::{Instrument, Level};

use crate::oauth::AuthenticatedCaller;
use crate::protocol::{McpRequest, McpResponse};
use crate::router::{RouterRequest, RouterResponse};

/// Tower layer that adds structured tracing to MCP requests.
#[derive(Debug, Clone, Copy)]
pub struct McpTracingLayer {
    level: Level,
}

impl Default for McpTracingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl McpTracingLayer {
    /// Completion events are logged at `INFO` unless changed with [`level`](Self::level).
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl<S> Layer<S> for McpTracingLayer {
    type Service = McpTracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        McpTracingService {
            inner,
            level: self.level,
        }
    }
}

/// Created by [`McpTracingLayer`].
#[derive(Debug, Clone)]
pub struct McpTracingService<S> {
    inner: S,
    level: Level,
}

impl<S> Service<RouterRequest> for McpTracingService<S>
where
    S: Service<RouterRequest, Response = RouterResponse, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = RouterResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<RouterResponse, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RouterRequest) -> Self::Future {
        let method = req.inner.method_name().to_string();
        let span = tracing::info_span!(
            "mcp_request",
            method = %method,
            request_id = ?req.id,
            tool = tool_name(&req.inner),
            authenticated = req.extensions.contains::<AuthenticatedCaller>(),
        );

        let start = Instant::now();
        let fut = self.inner.call(req);
        let level = self.level;

        Box::pin(
            async move {
                let result = fut.await;
                let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

                if let Ok(response) = &result {
                    match &response.inner {
                        Ok(McpResponse::CallTool(tool_result)) if tool_result.is_error => {
                            tracing::warn!(method = %method, duration_ms, "tool reported an error");
                        }
                        Ok(_) => log_success(level, &method, duration_ms),
                        Err(err) => {
                            tracing::warn!(
                                method = %method,
                                error_code = err.code,
                                error_message = %err.message,
                                duration_ms,
                                "MCP request failed"
                            );
                        }
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

fn tool_name(req: &McpRequest) -> Option<&str> {
    match req {
        McpRequest::CallTool(params) => Some(params.name.as_str()),
        _ => None,
    }
}

fn log_success(level: Level, method: &str, duration_ms: f64) {
    match level {
        Level::TRACE => tracing::trace!(method = %method, duration_ms, "MCP request completed"),
        Level::DEBUG => tracing::debug!(method = %method, duration_ms, "MCP request completed"),
        Level::INFO => tracing::info!(method = %method, duration_ms, "MCP request completed"),
        Level::WARN => tracing::warn!(method = %method, duration_ms, "MCP request completed"),
        Level::ERROR => tracing::error!(method = %method, duration_ms, "MCP request completed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::McpRouter;
    use crate::context::Extensions;
    use crate::protocol::{CallToolParams, RequestId};
    use tower::ServiceExt;

    #[test]
    fn test_layer_level() {
        assert_eq!(McpTracingLayer::new().level, Level::INFO);
        assert_eq!(McpTracingLayer::new().level(Level::DEBUG).level, Level::DEBUG);
    }

    #[test]
    fn test_tool_name() {
        let req = McpRequest::CallTool(CallToolParams {
            name: "get_upcoming_webinars".to_string(),
            arguments: serde_json::Value::Null,
        });
        assert_eq!(tool_name(&req), Some("get_upcoming_webinars"));
        assert_eq!(tool_name(&McpRequest::Ping), None);
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        let service = McpTracingLayer::new().layer(McpRouter::new());
        let response = service
            .oneshot(RouterRequest {
                id: RequestId::Number(3),
                inner: McpRequest::Ping,
                extensions: Extensions::new(),
            })
            .await
            .unwrap();

        assert_eq!(response.id, RequestId::Number(3));
        assert!(matches!(response.inner, Ok(McpResponse::Pong(_))));
    }
}
