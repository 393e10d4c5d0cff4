//! MCP Router - dispatches requests to registered tools
//!
//! The router is stateless: there is no session lifecycle, every request is
//! served on its own, and the only shared data is the immutable tool table
//! built at startup. It implements Tower's `Service` trait so it composes with
//! standard tower middleware and with [`JsonRpcService`](crate::JsonRpcService).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower_service::Service;

use crate::context::{Extensions, RequestContext};
use crate::error::{Error, JsonRpcError, Result};
use crate::protocol::*;
use crate::tool::Tool;

/// MCP Router that dispatches requests to registered tools
///
/// # Example
///
/// ```rust
/// use webinar_mcp::{CallToolResult, McpRouter, NoParams, ToolBuilder};
///
/// let tool = ToolBuilder::new("status")
///     .description("Report status")
///     .handler(|_: NoParams| async move { Ok(CallToolResult::text("ok")) })
///     .build()
///     .unwrap();
///
/// let router = McpRouter::new()
///     .server_info("my-server", "1.0.0")
///     .tool(tool);
/// ```
#[derive(Clone)]
pub struct McpRouter {
    inner: Arc<McpRouterInner>,
}

impl std::fmt::Debug for McpRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpRouter")
            .field("server_name", &self.inner.server_name)
            .field("server_version", &self.inner.server_version)
            .field("tools_count", &self.inner.tools.len())
            .finish()
    }
}

#[derive(Clone)]
struct McpRouterInner {
    server_name: String,
    server_version: String,
    instructions: Option<String>,
    tools: HashMap<String, Arc<Tool>>,
}

impl McpRouter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(McpRouterInner {
                server_name: env!("CARGO_PKG_NAME").to_string(),
                server_version: env!("CARGO_PKG_VERSION").to_string(),
                instructions: None,
                tools: HashMap::new(),
            }),
        }
    }

    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.server_name = name.into();
        inner.server_version = version.into();
        self
    }

    /// Set instructions for LLMs describing how to use this server
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).instructions = Some(instructions.into());
        self
    }

    /// Register a tool. A tool with the same name replaces the previous one.
    pub fn tool(mut self, tool: Tool) -> Self {
        Arc::make_mut(&mut self.inner)
            .tools
            .insert(tool.name.clone(), Arc::new(tool));
        self
    }

    pub fn tools(self, tools: impl IntoIterator<Item = Tool>) -> Self {
        tools.into_iter().fold(self, |router, tool| router.tool(tool))
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.tools.keys().cloned().collect();
        names.sort();
        names
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: if self.inner.tools.is_empty() {
                None
            } else {
                Some(ToolsCapability {
                    list_changed: false,
                })
            },
        }
    }

    async fn handle(
        &self,
        request_id: RequestId,
        request: McpRequest,
        extensions: Extensions,
    ) -> Result<McpResponse> {
        match request {
            McpRequest::Initialize(params) => {
                tracing::info!(
                    client = %params.client_info.name,
                    version = %params.client_info.version,
                    "Client initializing"
                );

                let protocol_version =
                    if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
                        params.protocol_version
                    } else {
                        LATEST_PROTOCOL_VERSION.to_string()
                    };

                Ok(McpResponse::Initialize(InitializeResult {
                    protocol_version,
                    capabilities: self.capabilities(),
                    server_info: Implementation {
                        name: self.inner.server_name.clone(),
                        version: self.inner.server_version.clone(),
                    },
                    instructions: self.inner.instructions.clone(),
                }))
            }

            McpRequest::ListTools(_params) => {
                let mut tools: Vec<ToolDefinition> =
                    self.inner.tools.values().map(|t| t.definition()).collect();
                tools.sort_by(|a, b| a.name.cmp(&b.name));

                Ok(McpResponse::ListTools(ListToolsResult {
                    tools,
                    next_cursor: None,
                }))
            }

            McpRequest::CallTool(params) => {
                let tool =
                    self.inner.tools.get(&params.name).ok_or_else(|| {
                        Error::JsonRpc(JsonRpcError::method_not_found(&params.name))
                    })?;

                let ctx = RequestContext::new(request_id).with_extensions(Arc::new(extensions));

                tracing::debug!(tool = %params.name, "Calling tool");
                let result = tool.call(ctx, params.arguments).await;

                Ok(McpResponse::CallTool(result))
            }

            McpRequest::Ping => Ok(McpResponse::Pong(EmptyResult {})),

            McpRequest::Unknown { method, .. } => {
                Err(Error::JsonRpc(JsonRpcError::method_not_found(&method)))
            }
        }
    }

    /// Handle an MCP notification (no response expected)
    pub fn handle_notification(&self, notification: McpNotification) {
        match notification {
            McpNotification::Initialized => {
                tracing::debug!("Client reported initialized");
            }
            McpNotification::Cancelled(params) => {
                // Requests are not tracked; an abandoned HTTP request already
                // drops its in-flight downstream call.
                tracing::debug!(
                    request_id = ?params.request_id,
                    reason = ?params.reason,
                    "Cancellation received"
                );
            }
            McpNotification::Unknown { method, .. } => {
                tracing::debug!(method = %method, "Unknown notification received");
            }
        }
    }
}

impl Default for McpRouter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tower Service implementation
// =============================================================================

/// Request type for the tower Service implementation
#[derive(Debug)]
pub struct RouterRequest {
    pub id: RequestId,
    pub inner: McpRequest,
    /// Data produced by middleware (e.g. the authenticated caller).
    pub extensions: Extensions,
}

/// Response type for the tower Service implementation
#[derive(Debug)]
pub struct RouterResponse {
    pub id: RequestId,
    pub inner: std::result::Result<McpResponse, JsonRpcError>,
}

impl RouterResponse {
    /// Convert to JSON-RPC response
    pub fn into_jsonrpc(self) -> JsonRpcResponse {
        match self.inner {
            Ok(response) => match serde_json::to_value(response) {
                Ok(result) => JsonRpcResponse::result(self.id, result),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize response");
                    JsonRpcResponse::error(
                        Some(self.id),
                        JsonRpcError::internal_error(format!("Serialization error: {}", e)),
                    )
                }
            },
            Err(error) => JsonRpcResponse::error(Some(self.id), error),
        }
    }
}

impl Service<RouterRequest> for McpRouter {
    type Response = RouterResponse;
    type Error = std::convert::Infallible; // Errors are in the response
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RouterRequest) -> Self::Future {
        let router = self.clone();
        let request_id = req.id.clone();
        Box::pin(async move {
            let result = router.handle(req.id, req.inner, req.extensions).await;
            Ok(RouterResponse {
                id: request_id,
                inner: result.map_err(|e| match e {
                    Error::JsonRpc(err) => err,
                    Error::Serialization(err) => JsonRpcError::invalid_params(err.to_string()),
                    e => JsonRpcError::internal_error(e.to_string()),
                }),
            })
        })
    }
}
