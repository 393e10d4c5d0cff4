//! JSON-RPC 2.0 framing for the MCP router
//!
//! [`JsonRpcService`] turns JSON-RPC requests into [`RouterRequest`]s and the
//! router's answers back into JSON-RPC responses. It handles:
//! - single requests and batches (batch members run concurrently)
//! - JSON-RPC version validation
//! - conversion of parse failures into error responses
//! - propagation of request [`Extensions`] to every router call

use tower::ServiceExt;
use tower_service::Service;

use crate::context::Extensions;
use crate::error::{JsonRpcError, Result};
use crate::protocol::{
    JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, JsonRpcResponseMessage, McpRequest,
};
use crate::router::{RouterRequest, RouterResponse};

/// Service that handles JSON-RPC framing around an MCP service.
///
/// ```rust
/// use webinar_mcp::{JsonRpcService, McpRouter};
///
/// let router = McpRouter::new().server_info("my-server", "1.0.0");
/// let service = JsonRpcService::new(router);
/// ```
#[derive(Debug, Clone)]
pub struct JsonRpcService<S> {
    inner: S,
}

impl<S> JsonRpcService<S>
where
    S: Service<RouterRequest, Response = RouterResponse, Error = std::convert::Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Process a single JSON-RPC request with no extensions.
    pub async fn call_single(&mut self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        Ok(process_single_request(self.inner.clone(), req, Extensions::new()).await)
    }

    /// Process a JSON-RPC message (single or batch).
    ///
    /// Each request in the message sees a clone of `extensions`.
    pub async fn call_message(
        &mut self,
        msg: JsonRpcMessage,
        extensions: Extensions,
    ) -> JsonRpcResponseMessage {
        match msg {
            JsonRpcMessage::Single(req) => JsonRpcResponseMessage::Single(
                process_single_request(self.inner.clone(), req, extensions).await,
            ),
            JsonRpcMessage::Batch(requests) => {
                if requests.is_empty() {
                    return JsonRpcResponseMessage::Single(JsonRpcResponse::error(
                        None,
                        JsonRpcError::invalid_request("Empty batch request"),
                    ));
                }

                let futures: Vec<_> = requests
                    .into_iter()
                    .map(|req| process_single_request(self.inner.clone(), req, extensions.clone()))
                    .collect();

                JsonRpcResponseMessage::Batch(futures::future::join_all(futures).await)
            }
        }
    }
}

async fn process_single_request<S>(
    inner: S,
    req: JsonRpcRequest,
    extensions: Extensions,
) -> JsonRpcResponse
where
    S: Service<RouterRequest, Response = RouterResponse, Error = std::convert::Infallible>
        + Send
        + 'static,
    S::Future: Send,
{
    if let Err(e) = req.validate() {
        return JsonRpcResponse::error(Some(req.id), e);
    }

    let mcp_request = match McpRequest::from_jsonrpc(&req) {
        Ok(r) => r,
        Err(e) => {
            return JsonRpcResponse::error(
                Some(req.id),
                JsonRpcError::invalid_params(e.to_string()),
            );
        }
    };

    let router_req = RouterRequest {
        id: req.id,
        inner: mcp_request,
        extensions,
    };

    match inner.oneshot(router_req).await {
        Ok(response) => response.into_jsonrpc(),
        Err(never) => match never {},
    }
}
